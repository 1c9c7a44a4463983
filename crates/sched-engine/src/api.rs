//! The marketplace API boundary, as types.
//!
//! Everything crossing this boundary is a tagged request/response struct
//! validated *here*; the scheduling core only ever sees fully-typed domain
//! values. Mutation requests arrive with wire-level strings (weekday names,
//! `"HH:MM"` times, country codes) and leave as [`crate::domain`] types or
//! as a [`ScheduleError`].
//!
//! [`MarketplaceApi`] states the operation contract; [`SnapshotStore`] is
//! the in-memory implementation used by tests and the CLI. The production
//! transport lives server-side and re-validates everything — the store here
//! mirrors those semantics so client logic can be exercised against them.

use std::collections::HashMap;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::conflict::validate_booking_time;
use crate::domain::{
    parse_weekday, weekday_from_index, AvailabilitySlot, Booking, BookingKind, BookingStatus,
    Mentor, TimeOfDay,
};
use crate::error::ScheduleError;

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ScheduleError),

    #[error("Transport error: {0}")]
    Transport(String),
}

// ── Mutation requests ───────────────────────────────────────────────────────

/// Request to book a single lesson. Preceded by a client-side
/// [`validate_booking_time`] call; the store re-validates regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub mentor_id: String,
    pub mentee_id: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub cost_cents: i64,
    #[serde(default)]
    pub use_subscription: bool,
}

/// Request to declare a new weekly availability range. Wire-level strings;
/// [`Self::into_slot`] is the validation gate into the domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAvailabilityRequest {
    pub mentor_id: String,
    pub day: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub recurring: bool,
}

impl CreateAvailabilityRequest {
    /// Validate into a domain slot, with a server-assigned id.
    pub fn into_slot(self, id: String) -> Result<AvailabilitySlot, ScheduleError> {
        let day = parse_weekday(&self.day)?;
        let start_time: TimeOfDay = self.start_time.parse()?;
        let end_time = self.end_time.as_deref().map(str::parse).transpose()?;
        if end_time.is_none() && self.duration <= 0 {
            return Err(ScheduleError::InvalidRequest(
                "range needs an end time or a positive duration".to_string(),
            ));
        }
        let interval = self.interval.unwrap_or(30);
        if interval <= 0 {
            return Err(ScheduleError::InvalidRequest(format!(
                "interval must be positive, got {interval}"
            )));
        }
        Ok(AvailabilitySlot {
            id,
            mentor_id: self.mentor_id,
            day,
            start_time,
            end_time,
            duration_minutes: self.duration,
            interval_minutes: interval,
            recurring: self.recurring,
        })
    }
}

/// Partial update of an existing range. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvailabilityRequest {
    pub slot_id: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub recurring: Option<bool>,
}

impl UpdateAvailabilityRequest {
    pub fn apply_to(&self, slot: &mut AvailabilitySlot) -> Result<(), ScheduleError> {
        if let Some(start) = &self.start_time {
            slot.start_time = start.parse()?;
        }
        if let Some(end) = &self.end_time {
            slot.end_time = Some(end.parse()?);
        }
        if let Some(duration) = self.duration {
            slot.duration_minutes = duration;
        }
        if let Some(interval) = self.interval {
            if interval <= 0 {
                return Err(ScheduleError::InvalidRequest(format!(
                    "interval must be positive, got {interval}"
                )));
            }
            slot.interval_minutes = interval;
        }
        if let Some(recurring) = self.recurring {
            slot.recurring = recurring;
        }
        Ok(())
    }
}

/// Request to carve one generated slot out of a weekly range. `day_of_week`
/// uses the boundary's numeric mapping (`Sun=0 .. Sat=6`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAvailabilitySlotRequest {
    pub mentor_id: String,
    pub day_of_week: u8,
    pub range_start_time: String,
    pub specific_slot_start_time: String,
}

impl DeleteAvailabilitySlotRequest {
    pub fn day(&self) -> Result<Weekday, ScheduleError> {
        weekday_from_index(self.day_of_week)
    }
}

// ── Snapshot ────────────────────────────────────────────────────────────────

/// A point-in-time fetch of everything the scheduling views need. Missing
/// sections deserialize as empty rather than failing the load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub mentors: Vec<Mentor>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    /// Participant id → display name, for calendar titles.
    #[serde(default)]
    pub names: HashMap<String, String>,
}

// ── Operation contract ──────────────────────────────────────────────────────

/// The operations the remote marketplace exposes, stated as a trait so the
/// engine can run against any transport. Synchronous by design: the core is
/// a single-threaded snapshot-in/derived-values-out computation, and the
/// transport adapter owns any async plumbing.
pub trait MarketplaceApi {
    fn mentor_by_id(&self, id: &str) -> Result<Option<Mentor>, ApiError>;

    /// All bookings, or only one mentor's when `mentor_id` is given.
    fn bookings(&self, mentor_id: Option<&str>) -> Result<Vec<Booking>, ApiError>;

    /// A mentor's scheduled lessons starting after `now`.
    fn mentor_upcoming_bookings(
        &self,
        mentor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, ApiError>;

    fn create_one_time_booking(
        &mut self,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, ApiError>;

    fn add_availability(
        &mut self,
        request: CreateAvailabilityRequest,
    ) -> Result<AvailabilitySlot, ApiError>;

    fn update_availability(
        &mut self,
        request: UpdateAvailabilityRequest,
    ) -> Result<AvailabilitySlot, ApiError>;

    fn delete_availability(&mut self, mentor_id: &str, slot_id: &str) -> Result<(), ApiError>;

    fn delete_availability_slot(
        &mut self,
        request: DeleteAvailabilitySlotRequest,
    ) -> Result<(), ApiError>;
}

// ── In-memory store ─────────────────────────────────────────────────────────

/// In-memory [`MarketplaceApi`] over a [`Snapshot`]. Mirrors the remote
/// service's validation semantics so booking flows can be exercised without
/// a network.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    mentors: Vec<Mentor>,
    bookings: Vec<Booking>,
    next_id: u64,
}

impl SnapshotStore {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            mentors: snapshot.mentors,
            bookings: snapshot.bookings,
            next_id: 1,
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn mentor_mut(&mut self, id: &str) -> Result<&mut Mentor, ApiError> {
        self.mentors
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("mentor '{id}'")))
    }
}

impl MarketplaceApi for SnapshotStore {
    fn mentor_by_id(&self, id: &str) -> Result<Option<Mentor>, ApiError> {
        Ok(self.mentors.iter().find(|m| m.id == id).cloned())
    }

    fn bookings(&self, mentor_id: Option<&str>) -> Result<Vec<Booking>, ApiError> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| mentor_id.is_none_or(|id| b.mentor_id == id))
            .cloned()
            .collect())
    }

    fn mentor_upcoming_bookings(
        &self,
        mentor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, ApiError> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                b.mentor_id == mentor_id
                    && b.status == BookingStatus::Scheduled
                    && b.start_time > now
            })
            .cloned()
            .collect())
    }

    fn create_one_time_booking(
        &mut self,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, ApiError> {
        let mentor = self
            .mentor_by_id(&request.mentor_id)?
            .ok_or_else(|| ApiError::NotFound(format!("mentor '{}'", request.mentor_id)))?;

        validate_booking_time(
            &mentor,
            &self.bookings,
            request.start_time,
            request.duration_minutes,
            now,
        )?;

        let booking = Booking {
            id: self.fresh_id("bk"),
            mentor_id: request.mentor_id,
            mentee_id: request.mentee_id,
            start_time: request.start_time,
            end_time: request.start_time + chrono::Duration::minutes(request.duration_minutes),
            status: BookingStatus::Scheduled,
            total_cost_cents: request.cost_cents,
            kind: if request.use_subscription {
                BookingKind::Subscription
            } else {
                BookingKind::OneTime
            },
        };
        self.bookings.push(booking.clone());
        Ok(booking)
    }

    fn add_availability(
        &mut self,
        request: CreateAvailabilityRequest,
    ) -> Result<AvailabilitySlot, ApiError> {
        let id = self.fresh_id("av");
        let mentor_id = request.mentor_id.clone();
        let slot = request.into_slot(id).map_err(ApiError::Validation)?;
        let mentor = self.mentor_mut(&mentor_id)?;
        mentor.availability.push(slot.clone());
        Ok(slot)
    }

    fn update_availability(
        &mut self,
        request: UpdateAvailabilityRequest,
    ) -> Result<AvailabilitySlot, ApiError> {
        let slot = self
            .mentors
            .iter_mut()
            .flat_map(|m| m.availability.iter_mut())
            .find(|s| s.id == request.slot_id)
            .ok_or_else(|| ApiError::NotFound(format!("availability '{}'", request.slot_id)))?;
        request.apply_to(slot).map_err(ApiError::Validation)?;
        Ok(slot.clone())
    }

    fn delete_availability(&mut self, mentor_id: &str, slot_id: &str) -> Result<(), ApiError> {
        let mentor = self.mentor_mut(mentor_id)?;
        let before = mentor.availability.len();
        mentor.availability.retain(|s| s.id != slot_id);
        if mentor.availability.len() == before {
            return Err(ApiError::NotFound(format!("availability '{slot_id}'")));
        }
        Ok(())
    }

    fn delete_availability_slot(
        &mut self,
        request: DeleteAvailabilitySlotRequest,
    ) -> Result<(), ApiError> {
        let day = request.day().map_err(ApiError::Validation)?;
        let range_start: TimeOfDay = request
            .range_start_time
            .parse()
            .map_err(ApiError::Validation)?;
        let slot_start: TimeOfDay = request
            .specific_slot_start_time
            .parse()
            .map_err(ApiError::Validation)?;

        let mentor = self.mentor_mut(&request.mentor_id)?;
        let position = mentor
            .availability
            .iter()
            .position(|s| s.day == day && s.start_time == range_start)
            .ok_or_else(|| {
                ApiError::NotFound(format!("range {day} {range_start} for '{}'", request.mentor_id))
            })?;

        let range = mentor.availability.remove(position);
        if !range.contains_wall_clock(day, slot_start) {
            // Put the untouched range back before reporting.
            mentor.availability.insert(position, range);
            return Err(ApiError::NotFound(format!(
                "slot {slot_start} inside range {day} {range_start}"
            )));
        }

        // Carving one occurrence out of a weekly range splits it in two:
        // the part before the slot and the part after. Either side may be
        // empty (slot at the head or tail of the range) and is dropped.
        let interval = range.interval_minutes;
        let range_end = range.effective_end();
        let slot_end = TimeOfDay::from_minutes(slot_start.minutes() + interval);

        let mut pieces = Vec::new();
        if slot_start > range.start_time {
            pieces.push(AvailabilitySlot {
                end_time: Some(slot_start),
                ..range.clone()
            });
        }
        if slot_end < range_end {
            pieces.push(AvailabilitySlot {
                id: format!("{}-tail", range.id),
                start_time: slot_end,
                end_time: Some(range_end),
                ..range.clone()
            });
        }
        if pieces.is_empty() {
            warn!(range = %range.id, "deleting the only slot removed the whole range");
        }
        for (i, piece) in pieces.into_iter().enumerate() {
            mentor.availability.insert(position + i, piece);
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
