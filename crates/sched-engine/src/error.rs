//! Error types for scheduling operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Unsupported timezone: {0}")]
    UnsupportedTimezone(String),

    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Booking time must be in the future: {0}")]
    PastBookingTime(String),

    #[error("Booking conflict: {0}")]
    BookingConflict(String),

    #[error("Outside declared availability: {0}")]
    OutsideAvailability(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
