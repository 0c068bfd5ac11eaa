// libs/doctor-cell/src/services/calendar.rs
//
// The clinic's fixed booking grid. Pure functions, no I/O.

use chrono::{Duration, NaiveDate, NaiveTime};

use shared_models::{parse_minute_time, truncate_to_minute};

use crate::models::{DoctorError, Slot};

pub const SLOT_MINUTES: i64 = 30;

/// Operating shifts as (opening hour, closing hour).
pub const SHIFTS: [(u32, u32); 2] = [(9, 12), (13, 16)];

/// Bookable half-hour windows for `day`, in order. The grid does not vary by
/// day of week.
pub fn generate_slots(_day: NaiveDate) -> Vec<Slot> {
    let width = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::with_capacity(12);

    for (open, close) in SHIFTS {
        let (Some(mut start), Some(close)) = (
            NaiveTime::from_hms_opt(open, 0, 0),
            NaiveTime::from_hms_opt(close, 0, 0),
        ) else {
            continue;
        };

        while start + width <= close {
            let end = start + width;
            slots.push(Slot { start, end });
            start = end;
        }
    }

    slots
}

/// Whether `time`, truncated to the minute, starts one of `day`'s slots.
pub fn is_slot_start(day: NaiveDate, time: NaiveTime) -> bool {
    let time = truncate_to_minute(time);
    generate_slots(day).iter().any(|slot| slot.start == time)
}

/// Parses a slot start given as `HH:MM` or `HH:MM:SS`.
pub fn parse_slot_time(raw: &str) -> Result<NaiveTime, DoctorError> {
    parse_minute_time(raw).ok_or_else(|| DoctorError::InvalidTimeSlot(format!("'{}' is not a time of day", raw)))
}

/// Dates a client may book: `today` and the following days, `window_days` in total.
pub fn bookable_dates(today: NaiveDate, window_days: u32) -> Vec<NaiveDate> {
    today.iter_days().take(window_days as usize).collect()
}

pub fn is_bookable_date(today: NaiveDate, window_days: u32, date: NaiveDate) -> bool {
    date >= today && (date - today).num_days() < i64::from(window_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn twelve_ordered_half_hour_slots() {
        let slots = generate_slots(day());
        assert_eq!(slots.len(), 12);
        assert!(slots.iter().all(|s| s.duration_minutes() == 30));
        assert!(slots.windows(2).all(|w| w[0].end <= w[1].start));
        assert_eq!(slots.first().map(|s| s.start), Some(t(9, 0)));
        assert_eq!(slots.last().map(|s| s.end), Some(t(16, 0)));
    }

    #[test]
    fn lunch_hour_is_not_bookable() {
        let slots = generate_slots(day());
        assert!(slots.iter().all(|s| s.start < t(12, 0) || s.start >= t(13, 0)));
        assert!(!is_slot_start(day(), t(12, 0)));
        assert!(!is_slot_start(day(), t(12, 30)));
        assert!(is_slot_start(day(), t(13, 0)));
    }

    #[test]
    fn same_grid_every_day_of_week() {
        let monday = generate_slots(day());
        for offset in 1..7 {
            let other = day() + Duration::days(offset);
            assert_eq!(generate_slots(other), monday);
        }
    }

    #[test]
    fn slot_starts_are_recognised_with_seconds() {
        assert!(is_slot_start(day(), NaiveTime::from_hms_opt(9, 30, 45).unwrap()));
        assert!(!is_slot_start(day(), t(9, 15)));
        assert!(!is_slot_start(day(), t(16, 0)));
        assert!(!is_slot_start(day(), t(8, 30)));
    }

    #[test]
    fn parses_slot_times() {
        assert_eq!(parse_slot_time("09:00").unwrap(), t(9, 0));
        assert_eq!(parse_slot_time("15:30:00").unwrap(), t(15, 30));
        assert!(parse_slot_time("half past nine").is_err());
    }

    #[test]
    fn booking_window_starts_today() {
        let dates = bookable_dates(day(), 4);
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[0], day());
        assert_eq!(dates[3], NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());

        assert!(is_bookable_date(day(), 4, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()));
        assert!(!is_bookable_date(day(), 4, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
        assert!(!is_bookable_date(day(), 4, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }
}
