//! Expansion of recurring weekly availability into concrete bookable slots.
//!
//! A mentor declares ranges like "Mondays 09:00–12:00" in their own timezone;
//! the expander walks a lookahead horizon day by day, matches each day's
//! weekday *as it reads in the mentor's timezone*, and cuts every matching
//! range into `interval`-minute candidate slots anchored to absolute instants.
//!
//! No system clock access: the caller supplies the `now` anchor, which both
//! positions the horizon and excludes slots already in the past.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::conflict::filter_booked;
use crate::domain::{AvailabilitySlot, Booking, CandidateSlot, Mentor, TimeOfDay};
use crate::timezone::{absolute_instant, wall_clock};

/// Expand availability ranges into candidate slots over `[now, now + horizon)`.
///
/// Each candidate is exactly `interval` minutes long; a range shorter than its
/// own interval yields nothing. Ranges wrapping past midnight spill their tail
/// slots onto the next calendar day. Candidates whose start is not strictly in
/// the future are discarded. Output is sorted chronologically.
///
/// Malformed ranges (non-positive interval) are skipped with a warning; the
/// display path never fails as a whole because one record is bad.
pub fn expand_availability(
    slots: &[AvailabilitySlot],
    mentor_tz: Tz,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Vec<CandidateSlot> {
    let mut out = Vec::new();

    for day_offset in 0..horizon_days {
        let local = wall_clock(now + Duration::days(day_offset), mentor_tz);
        let local_date = local.date();
        let weekday = local.weekday();

        for slot in slots.iter().filter(|s| s.day == weekday) {
            let interval = slot.interval_minutes;
            if interval <= 0 {
                warn!(slot = %slot.id, interval, "skipping range with non-positive interval");
                continue;
            }

            let total = slot.window_minutes();
            let start_minutes = slot.start_time.minutes();

            // `offset + interval <= total`, not `<`: a 60-minute range at a
            // 30-minute interval is two slots (+0 and +30), and the last slot
            // must still fit entirely inside the range.
            let mut offset = 0;
            while offset + interval <= total {
                let minutes = start_minutes + offset;
                let (date, time) = if minutes >= TimeOfDay::MINUTES_PER_DAY {
                    // Tail of a midnight-wrapping range: next calendar day.
                    (
                        local_date + Duration::days(1),
                        TimeOfDay::from_minutes(minutes - TimeOfDay::MINUTES_PER_DAY),
                    )
                } else {
                    (local_date, TimeOfDay::from_minutes(minutes))
                };

                let start = absolute_instant(date, time, mentor_tz);
                if start > now {
                    out.push(CandidateSlot {
                        start,
                        end: start + Duration::minutes(interval),
                    });
                }
                offset += interval;
            }
        }
    }

    out.sort_by_key(|c| c.start);
    out
}

/// The mentor's currently bookable slots: expansion minus slots already taken
/// by an occupying booking. This is the optimistic display path; committing a
/// booking still goes through [`crate::conflict::validate_booking_time`].
pub fn bookable_slots(
    mentor: &Mentor,
    bookings: &[Booking],
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Vec<CandidateSlot> {
    let candidates = expand_availability(&mentor.availability, mentor.timezone, now, horizon_days);
    filter_booked(candidates, mentor, bookings)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};
    use chrono_tz::America::New_York;
    use chrono_tz::Asia::Tokyo;

    fn range(day: Weekday, start: &str, end: Option<&str>, duration: i64) -> AvailabilitySlot {
        AvailabilitySlot {
            id: format!("r-{day}-{start}"),
            mentor_id: "m1".into(),
            day,
            start_time: start.parse().unwrap(),
            end_time: end.map(|e| e.parse().unwrap()),
            duration_minutes: duration,
            interval_minutes: 30,
            recurring: true,
        }
    }

    /// Sunday 2026-03-01 00:00 UTC — 09:00 Sunday in Tokyo.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_hour_range_yields_two_half_hour_slots() {
        // 08:00–09:00 at 30-minute interval: slots at +0 and +30, never 09:00.
        let slots = [range(Weekday::Mon, "08:00", Some("09:00"), 0)];
        let out = expand_availability(&slots, Tokyo, now(), 7);

        assert_eq!(out.len(), 2);
        // 08:00 Tokyo on Monday 2026-03-02 = 2026-03-01 23:00 UTC.
        assert_eq!(
            out[0].start,
            Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap()
        );
        assert_eq!(
            out[1].start,
            Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 0).unwrap()
        );
        assert_eq!(out[0].duration_minutes(), 30);
    }

    #[test]
    fn test_duration_used_when_end_absent() {
        let slots = [range(Weekday::Mon, "08:00", None, 90)];
        let out = expand_availability(&slots, Tokyo, now(), 7);
        assert_eq!(out.len(), 3); // 08:00, 08:30, 09:00
    }

    #[test]
    fn test_midnight_wrap_spills_to_next_day() {
        // Monday 23:00–00:30 Tokyo: 23:00, 23:30, and 00:00 on Tuesday.
        let slots = [range(Weekday::Mon, "23:00", Some("00:30"), 0)];
        let out = expand_availability(&slots, Tokyo, now(), 7);

        assert_eq!(out.len(), 3);
        // 23:00 Tokyo Mon Mar 2 = 14:00 UTC Mar 2.
        assert_eq!(
            out[0].start,
            Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap()
        );
        // 00:00 Tokyo Tue Mar 3 = 15:00 UTC Mar 2.
        assert_eq!(
            out[2].start,
            Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_recurrence_across_horizon() {
        // 14-day horizon from Sunday covers exactly two Mondays.
        let slots = [range(Weekday::Mon, "09:00", Some("10:00"), 0)];
        let out = expand_availability(&slots, Tokyo, now(), 14);
        assert_eq!(out.len(), 4); // 2 slots × 2 Mondays
    }

    #[test]
    fn test_past_slots_excluded() {
        // Anchor mid-Monday in Tokyo: 10:00 local, after the 09:00–10:00 range.
        let mid_monday = Utc.with_ymd_and_hms(2026, 3, 2, 1, 0, 0).unwrap();
        let slots = [range(Weekday::Mon, "09:00", Some("10:00"), 0)];
        let out = expand_availability(&slots, Tokyo, mid_monday, 14);

        // This Monday's slots are in the past; only next Monday's survive.
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.start > mid_monday));
        assert_eq!(
            out[0].start,
            Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_interval_other_than_thirty() {
        let mut slot = range(Weekday::Mon, "09:00", Some("10:00"), 0);
        slot.interval_minutes = 20;
        let out = expand_availability(&[slot], Tokyo, now(), 7);
        assert_eq!(out.len(), 3); // 09:00, 09:20, 09:40
        assert_eq!(out[0].duration_minutes(), 20);
    }

    #[test]
    fn test_range_shorter_than_interval_yields_nothing() {
        let slots = [range(Weekday::Mon, "09:00", Some("09:20"), 0)];
        assert!(expand_availability(&slots, Tokyo, now(), 7).is_empty());
    }

    #[test]
    fn test_non_positive_interval_skipped_not_fatal() {
        let mut bad = range(Weekday::Mon, "09:00", Some("10:00"), 0);
        bad.interval_minutes = 0;
        let good = range(Weekday::Mon, "12:00", Some("13:00"), 0);
        let out = expand_availability(&[bad, good], Tokyo, now(), 7);
        assert_eq!(out.len(), 2); // only the good range expands
    }

    #[test]
    fn test_day_matched_in_mentor_timezone_not_utc() {
        // Monday 08:00 in Tokyo is still Sunday in UTC; the match must use
        // the Tokyo weekday.
        let slots = [range(Weekday::Mon, "08:00", Some("08:30"), 0)];
        let out = expand_availability(&slots, Tokyo, now(), 7);
        assert_eq!(out.len(), 1);
        let start = out[0].start;
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap());
        assert_eq!(crate::timezone::wall_clock(start, Tokyo).weekday(), Weekday::Mon);
    }

    #[test]
    fn test_expansion_spans_dst_transition() {
        // New York springs forward on 2026-03-08. A Monday 09:00 range must
        // stay 09:00 local on both sides of the transition, so the UTC hour
        // shifts from 14:00 (EST) to 13:00 (EDT).
        let slots = [range(Weekday::Mon, "09:00", Some("09:30"), 0)];
        let out = expand_availability(&slots, New_York, now(), 14);

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].start,
            Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap()
        );
        assert_eq!(
            out[1].start,
            Utc.with_ymd_and_hms(2026, 3, 9, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_output_sorted_across_ranges() {
        let slots = [
            range(Weekday::Tue, "09:00", Some("10:00"), 0),
            range(Weekday::Mon, "09:00", Some("10:00"), 0),
        ];
        let out = expand_availability(&slots, Tokyo, now(), 14);
        assert!(out.windows(2).all(|w| w[0].start <= w[1].start));
    }
}
