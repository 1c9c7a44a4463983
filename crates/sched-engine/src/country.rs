//! Country → timezone resolution.
//!
//! One representative zone per country. Countries spanning several zones
//! collapse to their most populous one — good enough for defaulting a new
//! user's display timezone, never for anything compliance-grade.

use chrono_tz::Tz;
use tracing::warn;

use crate::error::ScheduleError;
use crate::timezone::{parse_timezone, system_timezone};

/// Representative IANA zone for an ISO 3166 country code, with a few common
/// non-ISO aliases (`UK`). Case-insensitive.
fn lookup(code: &str) -> Option<&'static str> {
    let name = match code {
        "US" => "America/New_York",
        "CA" => "America/Toronto",
        "MX" => "America/Mexico_City",
        "BR" => "America/Sao_Paulo",
        "AR" => "America/Argentina/Buenos_Aires",
        "CL" => "America/Santiago",
        "CO" => "America/Bogota",
        "PE" => "America/Lima",
        "GB" | "UK" => "Europe/London",
        "IE" => "Europe/Dublin",
        "FR" => "Europe/Paris",
        "DE" => "Europe/Berlin",
        "ES" => "Europe/Madrid",
        "PT" => "Europe/Lisbon",
        "IT" => "Europe/Rome",
        "NL" => "Europe/Amsterdam",
        "BE" => "Europe/Brussels",
        "CH" => "Europe/Zurich",
        "AT" => "Europe/Vienna",
        "SE" => "Europe/Stockholm",
        "NO" => "Europe/Oslo",
        "DK" => "Europe/Copenhagen",
        "FI" => "Europe/Helsinki",
        "PL" => "Europe/Warsaw",
        "CZ" => "Europe/Prague",
        "GR" => "Europe/Athens",
        "RO" => "Europe/Bucharest",
        "UA" => "Europe/Kyiv",
        "RU" => "Europe/Moscow",
        "TR" => "Europe/Istanbul",
        "IL" => "Asia/Jerusalem",
        "SA" => "Asia/Riyadh",
        "AE" => "Asia/Dubai",
        "EG" => "Africa/Cairo",
        "MA" => "Africa/Casablanca",
        "NG" => "Africa/Lagos",
        "KE" => "Africa/Nairobi",
        "ZA" => "Africa/Johannesburg",
        "IN" => "Asia/Kolkata",
        "NP" => "Asia/Kathmandu",
        "PK" => "Asia/Karachi",
        "BD" => "Asia/Dhaka",
        "TH" => "Asia/Bangkok",
        "VN" => "Asia/Ho_Chi_Minh",
        "ID" => "Asia/Jakarta",
        "MY" => "Asia/Kuala_Lumpur",
        "SG" => "Asia/Singapore",
        "PH" => "Asia/Manila",
        "CN" => "Asia/Shanghai",
        "TW" => "Asia/Taipei",
        "HK" => "Asia/Hong_Kong",
        "JP" => "Asia/Tokyo",
        "KR" => "Asia/Seoul",
        "AU" => "Australia/Sydney",
        "NZ" => "Pacific/Auckland",
        _ => return None,
    };
    Some(name)
}

/// Resolve a country code to its representative timezone.
///
/// Empty or unrecognized codes fall back to the host's own timezone rather
/// than erroring: this feeds display defaults, and a missing profile field
/// must not break a page.
pub fn get_timezone_by_country(country_code: &str) -> Tz {
    let code = country_code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return system_timezone();
    }
    match lookup(&code).and_then(|name| name.parse::<Tz>().ok()) {
        Some(tz) => tz,
        None => {
            warn!(country = %country_code, "no timezone mapping for country, using system timezone");
            system_timezone()
        }
    }
}

/// Explicitly selectable timezones. Narrower than what
/// [`get_timezone_by_country`] can produce: the picker in the settings UI
/// only offers these, while the resolver may default a profile to any zone
/// in the country table.
pub const SUPPORTED_TIMEZONES: &[&str] = &[
    "UTC",
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Toronto",
    "America/Sao_Paulo",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Europe/Madrid",
    "Europe/Moscow",
    "Asia/Dubai",
    "Asia/Kolkata",
    "Asia/Singapore",
    "Asia/Shanghai",
    "Asia/Tokyo",
    "Asia/Seoul",
    "Australia/Sydney",
    "Pacific/Auckland",
];

/// Validate an explicitly chosen timezone, or derive one from a country.
///
/// A set timezone must appear in [`SUPPORTED_TIMEZONES`]; anything else is a
/// hard validation error (the strict path — contrast with the permissive
/// primitives in [`crate::timezone`]). An unset timezone resolves through
/// [`get_timezone_by_country`].
pub fn validate_timezone(
    timezone: Option<&str>,
    fallback_country: &str,
) -> Result<Tz, ScheduleError> {
    match timezone {
        Some(tz) if SUPPORTED_TIMEZONES.contains(&tz) => parse_timezone(tz),
        Some(tz) => Err(ScheduleError::UnsupportedTimezone(format!("'{tz}'"))),
        None => Ok(get_timezone_by_country(fallback_country)),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
