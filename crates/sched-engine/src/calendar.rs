//! Projection of slots and bookings into calendar-renderable events.
//!
//! Events are derived values: recomputed from the current snapshot on every
//! render pass, with no identity beyond their derived id string. Event
//! `start`/`end` stay absolute; positioning on a calendar surface goes
//! through [`CalendarGrid`], which localizes into the *viewer's* timezone —
//! which may be neither the mentor's nor the mentee's.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::domain::{Booking, BookingStatus, CandidateSlot, Mentor, TimeOfDay};
use crate::timezone::wall_clock;

// ── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Available,
    Booked,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Booked => "booked",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        };
        f.write_str(s)
    }
}

impl EventKind {
    fn from_status(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Scheduled => Self::Booked,
            BookingStatus::Completed => Self::Completed,
            // Refunded lessons render like cancelled ones.
            BookingStatus::Cancelled | BookingStatus::Refunded => Self::Cancelled,
            BookingStatus::NoShow => Self::NoShow,
        }
    }
}

/// One renderable calendar event. `start`/`end` are absolute instants;
/// `slot_id`/`is_recurring` are only set on availability events, for the
/// edit and delete affordances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
}

/// Project bookings and open slots into a flat event list for one viewer.
///
/// Booking titles show the counterparty: the mentee's name when the viewer
/// is the mentor, the mentor's name otherwise. `names` maps participant ids
/// to display names; unknown ids fall back to the raw id. Availability
/// events are titled "Available" and carry the originating range's id.
pub fn project_events(
    available: &[CandidateSlot],
    bookings: &[Booking],
    mentor: &Mentor,
    viewer_id: &str,
    names: &HashMap<String, String>,
) -> Vec<CalendarEvent> {
    let display_name = |id: &str| -> String {
        names.get(id).cloned().unwrap_or_else(|| id.to_string())
    };

    let mut events = Vec::with_capacity(bookings.len() + available.len());

    for booking in bookings.iter().filter(|b| b.mentor_id == mentor.id) {
        let counterparty = if booking.mentee_id == viewer_id {
            &booking.mentor_id
        } else {
            &booking.mentee_id
        };
        events.push(CalendarEvent {
            id: format!("booking-{}", booking.id),
            title: display_name(counterparty),
            start: booking.start_time,
            end: booking.end_time,
            kind: EventKind::from_status(booking.status),
            is_recurring: false,
            slot_id: None,
        });
    }

    for slot in available {
        // Recover which declared range produced this candidate, for the
        // edit/delete affordances on availability events.
        let local = wall_clock(slot.start, mentor.timezone);
        let source = mentor
            .availability
            .iter()
            .find(|r| r.contains_wall_clock(local.weekday(), local.time_of_day()));

        events.push(CalendarEvent {
            id: match source {
                Some(r) => format!("slot-{}-{}", r.id, slot.start.timestamp()),
                None => format!("slot-{}", slot.start.timestamp()),
            },
            title: "Available".to_string(),
            start: slot.start,
            end: slot.end,
            kind: EventKind::Available,
            is_recurring: source.is_some_and(|r| r.recurring),
            slot_id: source.map(|r| r.id.clone()),
        });
    }

    events
}

// ── CalendarGrid ────────────────────────────────────────────────────────────

/// Events indexed by their start position on the viewer's wall clock, one
/// entry per `(date, hour, minute)` cell.
///
/// The grid owns its display timezone: switching the viewer to another zone
/// means building a new grid — there is no way to re-key one in place, so a
/// stale index can't survive a timezone change.
#[derive(Debug)]
pub struct CalendarGrid {
    display_tz: Tz,
    events: Vec<CalendarEvent>,
    index: HashMap<(NaiveDate, u32, u32), Vec<usize>>,
}

impl CalendarGrid {
    /// Index events by wall-clock start in `display_tz`. One pass; cell
    /// lookups afterwards are O(1) regardless of event count.
    pub fn build(events: Vec<CalendarEvent>, display_tz: Tz) -> Self {
        let mut index: HashMap<(NaiveDate, u32, u32), Vec<usize>> = HashMap::new();
        for (i, event) in events.iter().enumerate() {
            let local = wall_clock(event.start, display_tz);
            let time = local.time_of_day();
            index
                .entry((local.date(), time.hour(), time.minute()))
                .or_default()
                .push(i);
        }
        Self {
            display_tz,
            events,
            index,
        }
    }

    pub fn display_timezone(&self) -> Tz {
        self.display_tz
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Events whose start sits in the given calendar cell of the display
    /// timezone.
    pub fn events_at(&self, date: NaiveDate, time: TimeOfDay) -> Vec<&CalendarEvent> {
        self.index
            .get(&(date, time.hour(), time.minute()))
            .map(|ids| ids.iter().map(|&i| &self.events[i]).collect())
            .unwrap_or_default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AvailabilitySlot, BookingKind};
    use chrono::{Duration, TimeZone, Weekday};
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tokyo;

    fn mentor() -> Mentor {
        Mentor {
            id: "m1".into(),
            name: "Aiko".into(),
            timezone: Tokyo,
            country: "JP".into(),
            availability: vec![AvailabilitySlot {
                id: "r1".into(),
                mentor_id: "m1".into(),
                day: Weekday::Mon,
                start_time: "09:00".parse().unwrap(),
                end_time: Some("10:00".parse().unwrap()),
                duration_minutes: 0,
                interval_minutes: 30,
                recurring: true,
            }],
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        Booking {
            id: "b1".into(),
            mentor_id: "m1".into(),
            mentee_id: "s1".into(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            status,
            total_cost_cents: 2500,
            kind: BookingKind::OneTime,
        }
    }

    fn names() -> HashMap<String, String> {
        HashMap::from([
            ("m1".to_string(), "Aiko".to_string()),
            ("s1".to_string(), "Ben".to_string()),
        ])
    }

    // ── projection tests ────────────────────────────────────────────────

    #[test]
    fn test_status_maps_to_event_kind() {
        for (status, kind) in [
            (BookingStatus::Scheduled, EventKind::Booked),
            (BookingStatus::Completed, EventKind::Completed),
            (BookingStatus::Cancelled, EventKind::Cancelled),
            (BookingStatus::Refunded, EventKind::Cancelled),
            (BookingStatus::NoShow, EventKind::NoShow),
        ] {
            let events = project_events(&[], &[booking(status)], &mentor(), "m1", &names());
            assert_eq!(events[0].kind, kind, "{status:?}");
        }
    }

    #[test]
    fn test_title_is_counterparty_for_each_viewer() {
        let b = [booking(BookingStatus::Scheduled)];
        // Mentor viewing: sees the mentee's name.
        let as_mentor = project_events(&[], &b, &mentor(), "m1", &names());
        assert_eq!(as_mentor[0].title, "Ben");
        // Mentee viewing: sees the mentor's name.
        let as_mentee = project_events(&[], &b, &mentor(), "s1", &names());
        assert_eq!(as_mentee[0].title, "Aiko");
    }

    #[test]
    fn test_unknown_participant_falls_back_to_id() {
        let events = project_events(
            &[],
            &[booking(BookingStatus::Scheduled)],
            &mentor(),
            "m1",
            &HashMap::new(),
        );
        assert_eq!(events[0].title, "s1");
    }

    #[test]
    fn test_availability_event_carries_source_range() {
        // Monday 09:00 Tokyo.
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let slots = [CandidateSlot {
            start,
            end: start + Duration::minutes(30),
        }];
        let events = project_events(&slots, &[], &mentor(), "s1", &names());

        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.title, "Available");
        assert_eq!(e.kind, EventKind::Available);
        assert_eq!(e.slot_id.as_deref(), Some("r1"));
        assert!(e.is_recurring);
        assert_eq!(e.id, format!("slot-r1-{}", start.timestamp()));
    }

    #[test]
    fn test_booking_event_ids_are_stable() {
        let a = project_events(&[], &[booking(BookingStatus::Scheduled)], &mentor(), "m1", &names());
        let b = project_events(&[], &[booking(BookingStatus::Scheduled)], &mentor(), "m1", &names());
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[0].id, "booking-b1");
    }

    // ── grid tests ──────────────────────────────────────────────────────

    #[test]
    fn test_grid_localizes_to_viewer_timezone() {
        // Monday 09:00 Tokyo = Sunday 19:00 New York (EST, March 1).
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let slots = [CandidateSlot {
            start,
            end: start + Duration::minutes(30),
        }];
        let events = project_events(&slots, &[], &mentor(), "s1", &names());
        let grid = CalendarGrid::build(events, New_York);

        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let found = grid.events_at(sunday, "19:00".parse().unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, EventKind::Available);

        // Nothing lives at the Tokyo wall-clock position in this grid.
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(grid.events_at(monday, "09:00".parse().unwrap()).is_empty());
    }

    #[test]
    fn test_grid_rebuild_moves_cells_with_timezone() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let slots = [CandidateSlot {
            start,
            end: start + Duration::minutes(30),
        }];
        let events = project_events(&slots, &[], &mentor(), "s1", &names());

        let tokyo_grid = CalendarGrid::build(events.clone(), Tokyo);
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            tokyo_grid.events_at(monday, "09:00".parse().unwrap()).len(),
            1
        );

        let ny_grid = CalendarGrid::build(events, New_York);
        assert!(ny_grid.events_at(monday, "09:00".parse().unwrap()).is_empty());
    }

    #[test]
    fn test_grid_groups_events_in_same_cell() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let mut events = project_events(&[], &[booking(BookingStatus::Scheduled)], &mentor(), "m1", &names());
        events.extend(project_events(
            &[CandidateSlot {
                start,
                end: start + Duration::minutes(30),
            }],
            &[],
            &mentor(),
            "m1",
            &names(),
        ));
        let grid = CalendarGrid::build(events, Tokyo);
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(grid.events_at(monday, "09:00".parse().unwrap()).len(), 2);
    }
}
