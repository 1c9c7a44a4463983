//! Booking conflict detection.
//!
//! Two paths with deliberately different strictness:
//!
//! - **Read path** ([`filter_booked`]) — hides already-taken slots from the
//!   optimistic display. Never fails; bookings that don't parse into the
//!   mentor's slot grid simply don't hide anything.
//! - **Write path** ([`validate_booking_time`]) — the correctness gate in
//!   front of booking creation and reschedule. Errors here must surface to
//!   the caller unmodified; the server re-validates, but this is the last
//!   client-side word.
//!
//! On the read path all bookings sit on the same interval grid, so "conflict"
//! reduces to start-instant equality within a clock-skew tolerance. The write
//! path cannot assume a well-formed grid and uses true interval overlap.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Booking, CandidateSlot, Mentor};
use crate::error::{Result, ScheduleError};
use crate::timezone::wall_clock;

/// How far apart two start instants may drift and still count as the same
/// slot on the read path. Covers sub-minute rounding between clients.
pub const START_MATCH_TOLERANCE_SECS: i64 = 60;

/// Minimum bookable lesson length, minutes.
pub const MIN_LESSON_MINUTES: i64 = 30;
/// Maximum bookable lesson length, minutes.
pub const MAX_LESSON_MINUTES: i64 = 180;

/// Drop candidate slots already taken by an occupying booking for this
/// mentor. Bookings for other mentors (or a mentee's own other lessons) may
/// be present in the snapshot and are ignored here.
pub fn filter_booked(
    candidates: Vec<CandidateSlot>,
    mentor: &Mentor,
    bookings: &[Booking],
) -> Vec<CandidateSlot> {
    let taken: Vec<DateTime<Utc>> = bookings
        .iter()
        .filter(|b| b.mentor_id == mentor.id && b.status.occupies_slot())
        .map(|b| b.start_time)
        .collect();

    candidates
        .into_iter()
        .filter(|c| {
            !taken
                .iter()
                .any(|t| (*t - c.start).num_seconds().abs() <= START_MATCH_TOLERANCE_SECS)
        })
        .collect()
}

/// Validate a prospective booking `[start, start + duration)` for a mentor.
///
/// Checks, in order:
///
/// 1. `start` is strictly in the future relative to the supplied `now`.
/// 2. `duration` is within `[30, 180]` minutes.
/// 3. No existing booking for this mentor — other than cancelled/refunded
///    ones — truly overlaps the requested interval.
/// 4. If the mentor declares any availability, the requested start falls
///    inside one of the declared ranges (weekday plus wall-clock window, in
///    the mentor's timezone). Mentors with no declared ranges skip this
///    check entirely.
///
/// # Errors
///
/// The first violated rule is returned; conflicts name the existing lesson's
/// time so the UI can show the user what is in the way.
pub fn validate_booking_time(
    mentor: &Mentor,
    bookings: &[Booking],
    start: DateTime<Utc>,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    if start <= now {
        return Err(ScheduleError::PastBookingTime(start.to_rfc3339()));
    }

    if !(MIN_LESSON_MINUTES..=MAX_LESSON_MINUTES).contains(&duration_minutes) {
        return Err(ScheduleError::InvalidDuration(format!(
            "lesson must be between {MIN_LESSON_MINUTES} and {MAX_LESSON_MINUTES} minutes, got {duration_minutes}"
        )));
    }

    let end = start + Duration::minutes(duration_minutes);
    if let Some(existing) = bookings
        .iter()
        .filter(|b| b.mentor_id == mentor.id && b.status.blocks_new_booking())
        .find(|b| b.overlaps(start, end))
    {
        return Err(ScheduleError::BookingConflict(format!(
            "overlaps an existing lesson from {} to {}",
            existing.start_time.to_rfc3339(),
            existing.end_time.to_rfc3339()
        )));
    }

    if !mentor.availability.is_empty() {
        let local = wall_clock(start, mentor.timezone);
        let inside = mentor
            .availability
            .iter()
            .any(|s| s.contains_wall_clock(local.weekday(), local.time_of_day()));
        if !inside {
            return Err(ScheduleError::OutsideAvailability(format!(
                "{} {} is outside the mentor's declared hours",
                local.weekday(),
                local.time_of_day()
            )));
        }
    }

    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────
