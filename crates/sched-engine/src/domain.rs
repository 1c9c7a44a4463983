//! Domain model for mentor availability and lesson bookings.
//!
//! Two kinds of time live side by side here and must never be mixed:
//!
//! - **Absolute instants** (`DateTime<Utc>`) — booking start/end times, the
//!   only representation arithmetic is permitted on.
//! - **Wall-clock values** (`TimeOfDay`, [`chrono::Weekday`]) — mentor-declared
//!   recurring windows, meaningful only together with the mentor's timezone.
//!
//! The [`crate::timezone`] module owns every crossing between the two.

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

// ── Weekday helpers ─────────────────────────────────────────────────────────

/// Parse a weekday abbreviation or full name (`"Mon"`, `"monday"`, ...).
pub fn parse_weekday(s: &str) -> Result<Weekday, ScheduleError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| ScheduleError::InvalidWeekday(format!("'{s}'")))
}

/// Numeric index used at the API boundary: `Sun=0, Mon=1, ..., Sat=6`.
pub fn weekday_to_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// Inverse of [`weekday_to_index`].
pub fn weekday_from_index(index: u8) -> Result<Weekday, ScheduleError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(ScheduleError::InvalidWeekday(format!(
            "index {index} out of range 0-6"
        ))),
    }
}

/// Serde adapter pinning the wire format to `"Mon".."Sun"` abbreviations.
mod weekday_str {
    use chrono::Weekday;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const ABBREV: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    pub fn serialize<S: Serializer>(day: &Weekday, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(ABBREV[day.num_days_from_monday() as usize])
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Weekday, D::Error> {
        let s = String::deserialize(de)?;
        super::parse_weekday(&s).map_err(de::Error::custom)
    }
}

// ── TimeOfDay ───────────────────────────────────────────────────────────────

/// A wall-clock time of day, stored as minutes since midnight.
///
/// Parsed from `"HH:MM"`. The literal `"24:00"` is accepted and normalized to
/// `23:59` (end-of-day marker used by some availability ranges). A `TimeOfDay`
/// carries no timezone and no date; it only becomes an instant through
/// [`crate::timezone::absolute_instant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MINUTES_PER_DAY: i64 = 24 * 60;

    /// Construct from minutes since midnight, wrapping past midnight.
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.rem_euclid(Self::MINUTES_PER_DAY) as u32)
    }

    /// Construct from hour/minute components.
    ///
    /// Returns an error if `hour > 23` or `minute > 59` (except the `24:00`
    /// end-of-day marker, which normalizes to `23:59`).
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour == 24 && minute == 0 {
            return Ok(Self(23 * 60 + 59));
        }
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeOfDay(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self(hour * 60 + minute))
    }

    pub fn minutes(self) -> i64 {
        i64::from(self.0)
    }

    pub fn hour(self) -> u32 {
        self.0 / 60
    }

    pub fn minute(self) -> u32 {
        self.0 % 60
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTimeOfDay(format!("'{s}'"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> String {
        t.to_string()
    }
}

// ── AvailabilitySlot ────────────────────────────────────────────────────────

fn default_interval() -> i64 {
    30
}

/// A mentor-declared recurring weekly availability range.
///
/// `day`, `start_time` and `end_time` are wall-clock values in the mentor's
/// own timezone. When `end_time` is absent the range length comes from
/// `duration` instead. Output slots are always exactly `interval` minutes
/// long regardless of the range length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub id: String,
    pub mentor_id: String,
    #[serde(with = "weekday_str")]
    pub day: Weekday,
    pub start_time: TimeOfDay,
    #[serde(default)]
    pub end_time: Option<TimeOfDay>,
    /// Range length in minutes; only consulted when `end_time` is absent.
    #[serde(rename = "duration")]
    pub duration_minutes: i64,
    /// Generation granularity in minutes.
    #[serde(rename = "interval", default = "default_interval")]
    pub interval_minutes: i64,
    /// Whether the range repeats weekly. Expansion currently ignores this
    /// flag (every range is expanded across the whole horizon); it is carried
    /// through to calendar events for edit affordances only.
    #[serde(default)]
    pub recurring: bool,
}

impl AvailabilitySlot {
    /// The effective wall-clock end of the range: `end_time` when declared,
    /// otherwise `start_time + duration` wrapped past midnight.
    pub fn effective_end(&self) -> TimeOfDay {
        match self.end_time {
            Some(end) => end,
            None => TimeOfDay::from_minutes(self.start_time.minutes() + self.duration_minutes),
        }
    }

    /// Total window length in minutes. A range whose end reads earlier than
    /// its start wraps past midnight, so the naive difference is shifted by a
    /// full day.
    pub fn window_minutes(&self) -> i64 {
        let mut total = self.effective_end().minutes() - self.start_time.minutes();
        if total < 0 {
            total += TimeOfDay::MINUTES_PER_DAY;
        }
        total
    }

    /// Whether a wall-clock moment (already projected into the mentor's
    /// timezone) falls inside this range: weekday match plus
    /// `start <= t < end`, compared circularly when the range wraps midnight.
    pub fn contains_wall_clock(&self, day: Weekday, t: TimeOfDay) -> bool {
        if day != self.day {
            return false;
        }
        let start = self.start_time.minutes();
        let end = self.effective_end().minutes();
        let t = t.minutes();
        if start <= end {
            start <= t && t < end
        } else {
            t >= start || t < end
        }
    }
}

// ── Booking ─────────────────────────────────────────────────────────────────

/// Booking lifecycle status. Bookings are never deleted, only moved between
/// statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
    Refunded,
}

impl BookingStatus {
    /// Whether this booking occupies its slot on the display path. Only
    /// scheduled and completed bookings hide candidate slots.
    pub fn occupies_slot(self) -> bool {
        matches!(self, Self::Scheduled | Self::Completed)
    }

    /// Whether this booking blocks a *new* booking at an overlapping time.
    /// Broader than [`Self::occupies_slot`]: a no-show still blocks the write
    /// path; only cancelled and refunded bookings free their interval.
    pub fn blocks_new_booking(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Refunded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingKind {
    OneTime,
    Subscription,
}

/// A lesson booking between a mentor and a mentee. Start and end are absolute
/// instants; the viewer's calendar localizes them at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub mentor_id: String,
    pub mentee_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub total_cost_cents: i64,
    #[serde(rename = "type")]
    pub kind: BookingKind,
}

impl Booking {
    /// True interval overlap against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }
}

// ── Mentor ──────────────────────────────────────────────────────────────────

/// Read-only mentor snapshot as fetched from the marketplace API.
///
/// A missing `availability` field deserializes to an empty list rather than
/// failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mentor {
    pub id: String,
    pub name: String,
    pub timezone: Tz,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub availability: Vec<AvailabilitySlot>,
}

// ── CandidateSlot ───────────────────────────────────────────────────────────

/// One discrete bookable instance produced by expanding an availability range.
/// Ephemeral: recomputed from the current snapshot on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CandidateSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &CandidateSlot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
