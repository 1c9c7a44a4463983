//! # sched-engine
//!
//! Deterministic lesson scheduling for a language-tutoring marketplace.
//!
//! Mentors declare recurring weekly availability in their own timezone;
//! mentees browse and book lessons in theirs. This crate owns everything
//! between those two clocks: expanding declared ranges into concrete
//! bookable slots, reconciling them against existing bookings, validating
//! prospective bookings, and projecting the result into any viewer's
//! calendar. Persistence and transport live behind the typed
//! [`api::MarketplaceApi`] boundary; the engine itself computes over
//! snapshots and never touches the system clock — callers pass `now`.
//!
//! ## Modules
//!
//! - [`timezone`] — wall-clock projection and absolute-instant construction
//! - [`country`] — country → timezone defaults, strict timezone validation
//! - [`domain`] — availability ranges, bookings, candidate slots
//! - [`expander`] — weekly ranges → concrete bookable slots over a horizon
//! - [`conflict`] — slot filtering against bookings, booking validation
//! - [`calendar`] — viewer-localized calendar events and cell index
//! - [`api`] — typed request DTOs and the marketplace operation contract
//! - [`error`] — error types

pub mod api;
pub mod calendar;
pub mod conflict;
pub mod country;
pub mod domain;
pub mod error;
pub mod expander;
pub mod timezone;

pub use api::{
    ApiError, CreateAvailabilityRequest, CreateBookingRequest, DeleteAvailabilitySlotRequest,
    MarketplaceApi, Snapshot, SnapshotStore, UpdateAvailabilityRequest,
};
pub use calendar::{project_events, CalendarEvent, CalendarGrid, EventKind};
pub use conflict::{filter_booked, validate_booking_time};
pub use country::{get_timezone_by_country, validate_timezone, SUPPORTED_TIMEZONES};
pub use domain::{
    parse_weekday, weekday_from_index, weekday_to_index, AvailabilitySlot, Booking, BookingKind,
    BookingStatus, CandidateSlot, Mentor, TimeOfDay,
};
pub use error::{Result, ScheduleError};
pub use expander::{bookable_slots, expand_availability};
pub use timezone::{
    absolute_instant, absolute_instant_named, format_in_timezone, parse_timezone, system_timezone,
    wall_clock, wall_clock_named, WallClock,
};
