//! Timezone conversion primitives.
//!
//! All scheduling arithmetic happens on absolute instants (`DateTime<Utc>`).
//! The two crossings between instants and human wall-clock time are:
//!
//! - [`wall_clock`] — project an instant into a timezone for *reading only*
//!   (weekday, hour, minute). The result is a [`WallClock`], which cannot be
//!   converted back into an instant; chaining display values into arithmetic
//!   is a structural error, not a runtime one.
//! - [`absolute_instant`] — reconstruct the instant a wall-clock time names
//!   in a given timezone, honoring that zone's offset rules on that date
//!   (offsets shift with daylight-saving transitions, and some zones carry
//!   non-whole-hour offsets).
//!
//! The `*_named` variants accept IANA names from untrusted snapshots and
//! degrade with a logged warning instead of failing: an unrecognized zone
//! must not take down a whole calendar render.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use tracing::warn;

use crate::domain::TimeOfDay;
use crate::error::ScheduleError;

/// Parse an IANA timezone name into `Tz`.
pub fn parse_timezone(s: &str) -> Result<Tz, ScheduleError> {
    s.parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(format!("'{s}'")))
}

/// The host's IANA timezone, `UTC` if it cannot be determined.
pub fn system_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(zone = %name, "system timezone not in tz database, using UTC");
            Tz::UTC
        }),
        Err(e) => {
            warn!(error = %e, "cannot determine system timezone, using UTC");
            Tz::UTC
        }
    }
}

// ── Wall-clock projection ───────────────────────────────────────────────────

/// An instant as it reads on a clock in some timezone. Read-only by design:
/// there is deliberately no way back to a `DateTime` from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    naive: NaiveDateTime,
}

impl WallClock {
    pub fn date(&self) -> NaiveDate {
        self.naive.date()
    }

    pub fn weekday(&self) -> Weekday {
        self.naive.weekday()
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        use chrono::Timelike;
        TimeOfDay::from_minutes(i64::from(self.naive.hour() * 60 + self.naive.minute()))
    }
}

/// Project an instant into a timezone's wall clock.
pub fn wall_clock(instant: DateTime<Utc>, tz: Tz) -> WallClock {
    WallClock {
        naive: instant.with_timezone(&tz).naive_local(),
    }
}

/// Project an instant into a timezone given by name.
///
/// Unrecognized names degrade to the instant's UTC reading with a warning;
/// display code keeps rendering rather than erroring out.
pub fn wall_clock_named(instant: DateTime<Utc>, timezone: &str) -> WallClock {
    match parse_timezone(timezone) {
        Ok(tz) => wall_clock(instant, tz),
        Err(_) => {
            warn!(zone = %timezone, "unrecognized timezone, reading wall clock in UTC");
            WallClock {
                naive: instant.naive_utc(),
            }
        }
    }
}

// ── Absolute-instant construction ───────────────────────────────────────────

/// The instant at which `date`/`time` occurs on clocks in `tz`.
///
/// Daylight-saving edges on the transition date itself resolve
/// deterministically: a folded (repeated) wall-clock time takes its earliest
/// occurrence; a skipped time takes the first valid instant after the gap.
pub fn absolute_instant(date: NaiveDate, time: TimeOfDay, tz: Tz) -> DateTime<Utc> {
    let naive = date
        .and_hms_opt(time.hour(), time.minute(), 0)
        .expect("TimeOfDay is always a valid hour/minute");
    from_local(naive, tz).with_timezone(&Utc)
}

/// [`absolute_instant`] for a timezone given by name.
///
/// Unrecognized names degrade to interpreting the wall-clock time in the
/// host's own timezone, with a warning.
pub fn absolute_instant_named(date: NaiveDate, time: TimeOfDay, timezone: &str) -> DateTime<Utc> {
    match parse_timezone(timezone) {
        Ok(tz) => absolute_instant(date, time, tz),
        Err(_) => {
            warn!(zone = %timezone, "unrecognized timezone, interpreting time as system-local");
            absolute_instant(date, time, system_timezone())
        }
    }
}

fn from_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // Spring-forward gap: walk forward in 15-minute steps (the finest
            // transition granularity in the tz database) until the clock
            // exists again. Gaps never exceed a few hours.
            let mut probe = naive;
            loop {
                probe += Duration::minutes(15);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt;
                }
                if probe - naive > Duration::hours(6) {
                    return Utc.from_utc_datetime(&naive).with_timezone(&tz);
                }
            }
        }
    }
}

// ── Formatting ──────────────────────────────────────────────────────────────

/// Format an instant as it reads in a named timezone, using a chrono
/// `strftime` pattern.
pub fn format_in_timezone(
    instant: DateTime<Utc>,
    timezone: &str,
    fmt: &str,
) -> Result<String, ScheduleError> {
    let tz = parse_timezone(timezone)?;
    Ok(instant.with_timezone(&tz).format(fmt).to_string())
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::{Kathmandu, Tokyo};

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ── wall_clock tests ────────────────────────────────────────────────

    #[test]
    fn test_wall_clock_reads_target_zone_fields() {
        // 2026-03-02 00:00 UTC is 09:00 Monday in Tokyo.
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let wc = wall_clock(instant, Tokyo);
        assert_eq!(wc.weekday(), Weekday::Mon);
        assert_eq!(wc.time_of_day().to_string(), "09:00");
        assert_eq!(wc.date(), d(2026, 3, 2));
    }

    #[test]
    fn test_wall_clock_crosses_date_line() {
        // Late evening UTC is already the next day in Tokyo.
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 22, 0, 0).unwrap();
        let wc = wall_clock(instant, Tokyo);
        assert_eq!(wc.date(), d(2026, 3, 3));
        assert_eq!(wc.weekday(), Weekday::Tue);
    }

    #[test]
    fn test_wall_clock_named_unknown_zone_degrades_to_utc() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 22, 0, 0).unwrap();
        let wc = wall_clock_named(instant, "Invalid/Zone");
        assert_eq!(wc.date(), d(2026, 3, 2));
        assert_eq!(wc.time_of_day().to_string(), "22:00");
    }

    // ── absolute_instant tests ──────────────────────────────────────────

    #[test]
    fn test_absolute_instant_tokyo() {
        // 09:00 Tokyo = 00:00 UTC (UTC+9, no DST).
        let instant = absolute_instant(d(2026, 3, 2), t("09:00"), Tokyo);
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_absolute_instant_respects_dst_offset_change() {
        // New York is EST (UTC-5) in January, EDT (UTC-4) in July.
        let winter = absolute_instant(d(2026, 1, 15), t("09:00"), New_York);
        assert_eq!(winter, Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap());

        let summer = absolute_instant(d(2026, 7, 15), t("09:00"), New_York);
        assert_eq!(summer, Utc.with_ymd_and_hms(2026, 7, 15, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_absolute_instant_non_whole_hour_offset() {
        // Kathmandu is UTC+5:45 year-round.
        let instant = absolute_instant(d(2026, 3, 2), t("09:00"), Kathmandu);
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 2, 3, 15, 0).unwrap());
    }

    #[test]
    fn test_absolute_instant_spring_forward_gap() {
        // 2026-03-08 02:30 does not exist in New York (clocks jump 02:00→03:00);
        // the first valid instant after the gap is 03:00 EDT = 07:00 UTC.
        let instant = absolute_instant(d(2026, 3, 8), t("02:30"), New_York);
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 8, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_absolute_instant_fall_back_fold_takes_earliest() {
        // 2026-11-01 01:30 occurs twice in New York; earliest is EDT (UTC-4).
        let instant = absolute_instant(d(2026, 11, 1), t("01:30"), New_York);
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap());
    }

    #[test]
    fn test_round_trip_wall_clock() {
        for (date, time, tz) in [
            (d(2026, 3, 2), "09:00", Tokyo),
            (d(2026, 3, 7), "23:30", New_York), // day before spring forward
            (d(2026, 3, 9), "00:00", New_York), // day after
            (d(2026, 6, 15), "05:45", Kathmandu),
        ] {
            let instant = absolute_instant(date, t(time), tz);
            let wc = wall_clock(instant, tz);
            assert_eq!(wc.date(), date, "{tz} {time}");
            assert_eq!(wc.time_of_day(), t(time), "{tz} {time}");
        }
    }

    // ── format tests ────────────────────────────────────────────────────

    #[test]
    fn test_format_in_timezone() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let s = format_in_timezone(instant, "Asia/Tokyo", "%Y-%m-%d %H:%M").unwrap();
        assert_eq!(s, "2026-03-02 09:00");
    }

    #[test]
    fn test_format_invalid_timezone_errors() {
        let instant = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let err = format_in_timezone(instant, "Mars/Olympus", "%H:%M").unwrap_err();
        assert!(err.to_string().contains("Invalid timezone"), "got: {err}");
    }
}
