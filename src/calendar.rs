//! Virtual Calendar Mapping
//!
//! Converts between calendar dates and abstract (phase, week, day) slots.
//! The schedule grid is virtual: a program occupies whichever calendar
//! dates fall on the athlete's selected training weekdays, starting from
//! the first selected weekday on/after the program start date. Slots are
//! totally ordered by an absolute occurrence index; the program is a
//! terminal three-phase run, so indices past SSP map to no slot.

use chrono::{Datelike, NaiveDate};

use crate::models::{Phase, WorkoutSlot, WEEKS_PER_PHASE};

/// Walk limit guarding against malformed weekday sets or far-future dates
const MAX_SLOT_WALK: i64 = 100;

fn is_training_day(date: NaiveDate, weekdays: &[u8]) -> bool {
    weekdays.contains(&(date.weekday().num_days_from_monday() as u8))
}

/// First occurrence of the earliest selected weekday on/after `start`.
/// This anchors week 1 day 1, so a mid-week program start waits for the
/// next week head; selected weekdays before the anchor carry no slot.
pub fn first_training_date(start: NaiveDate, weekdays: &[u8]) -> Option<NaiveDate> {
    let earliest = weekdays.iter().copied().min()?;
    let mut date = start;
    for _ in 0..7 {
        if date.weekday().num_days_from_monday() as u8 == earliest {
            return Some(date);
        }
        date = date.succ_opt()?;
    }
    None
}

/// Map a calendar date onto its workout slot, or None when the date falls
/// before the program start, on a non-training weekday, or past the end
/// of the three-phase run.
pub fn slot_for_date(
    start: NaiveDate,
    weekdays: &[u8],
    target: NaiveDate,
) -> Option<WorkoutSlot> {
    let first = first_training_date(start, weekdays)?;
    if target < first {
        return None;
    }

    let mut cursor = first;
    let mut index: i64 = 0;
    for _ in 0..MAX_SLOT_WALK {
        if cursor == target {
            return slot_at_index(index, weekdays.len() as i64);
        }
        if cursor > target {
            // Walked past it: the target is not a training day
            return None;
        }
        cursor = cursor.succ_opt()?;
        while !is_training_day(cursor, weekdays) {
            cursor = cursor.succ_opt()?;
        }
        index += 1;
    }
    None
}

/// Convert an absolute occurrence index to its slot. None once the index
/// runs past the last SSP slot.
pub fn slot_at_index(index: i64, workouts_per_week: i64) -> Option<WorkoutSlot> {
    if index < 0 || workouts_per_week <= 0 {
        return None;
    }
    let per_phase = WEEKS_PER_PHASE * workouts_per_week;
    let phase = Phase::from_index(index / per_phase)?;
    let rem = index % per_phase;
    Some(WorkoutSlot {
        phase,
        week: rem / workouts_per_week + 1,
        day: rem % workouts_per_week + 1,
    })
}

/// Linear index of a slot; the inverse of `slot_at_index`. Used for
/// ordering and range comparisons between slots.
pub fn absolute_index(slot: WorkoutSlot, workouts_per_week: i64) -> i64 {
    slot.phase.index() * WEEKS_PER_PHASE * workouts_per_week
        + (slot.week - 1) * workouts_per_week
        + (slot.day - 1)
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Monday 2025-06-02, training Mon/Wed/Fri
    const MWF: [u8; 3] = [0, 2, 4];

    #[test]
    fn test_first_training_date_anchors_on_earliest_weekday() {
        // Start on a Tuesday, Monday-only schedule: first slot is next Monday
        let first = first_training_date(date(2025, 6, 3), &[0]).unwrap();
        assert_eq!(first, date(2025, 6, 9));

        // Start already on the earliest training day
        let first = first_training_date(date(2025, 6, 2), &MWF).unwrap();
        assert_eq!(first, date(2025, 6, 2));

        // Mid-week start waits for the next week head, so day numbering
        // stays aligned: the in-between Wednesday and Friday have no slot.
        let first = first_training_date(date(2025, 6, 4), &MWF).unwrap();
        assert_eq!(first, date(2025, 6, 9));
        assert!(slot_for_date(date(2025, 6, 4), &MWF, date(2025, 6, 4)).is_none());
        assert!(slot_for_date(date(2025, 6, 4), &MWF, date(2025, 6, 6)).is_none());
        let slot = slot_for_date(date(2025, 6, 4), &MWF, date(2025, 6, 9)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Gpp, 1, 1));
    }

    #[test]
    fn test_slot_for_date_first_week() {
        let start = date(2025, 6, 2);
        let slot = slot_for_date(start, &MWF, date(2025, 6, 2)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Gpp, 1, 1));

        let slot = slot_for_date(start, &MWF, date(2025, 6, 4)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Gpp, 1, 2));

        let slot = slot_for_date(start, &MWF, date(2025, 6, 6)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Gpp, 1, 3));

        // Next Monday rolls into week 2
        let slot = slot_for_date(start, &MWF, date(2025, 6, 9)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Gpp, 2, 1));
    }

    #[test]
    fn test_slot_for_date_rejects_off_days() {
        let start = date(2025, 6, 2);
        // Tuesday is not a selected weekday
        assert!(slot_for_date(start, &MWF, date(2025, 6, 3)).is_none());
        // Dates before the program start have no slot
        assert!(slot_for_date(start, &MWF, date(2025, 5, 30)).is_none());
        // Empty weekday set never maps
        assert!(slot_for_date(start, &[], date(2025, 6, 2)).is_none());
    }

    #[test]
    fn test_slot_for_date_crosses_phases() {
        let start = date(2025, 6, 2);
        // 12 occurrences per phase at 3/week: occurrence 12 is SPP w1 d1,
        // which lands 4 calendar weeks after the start.
        let slot = slot_for_date(start, &MWF, date(2025, 6, 30)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Spp, 1, 1));
    }

    #[test]
    fn test_slot_for_date_terminal_after_ssp() {
        let start = date(2025, 6, 2);
        // 36 occurrences = 12 calendar weeks; the Monday after the last
        // SSP week has no slot.
        let slot = slot_for_date(start, &MWF, date(2025, 8, 22)).unwrap();
        assert_eq!((slot.phase, slot.week, slot.day), (Phase::Ssp, 4, 3));
        assert!(slot_for_date(start, &MWF, date(2025, 8, 25)).is_none());
    }

    #[test]
    fn test_slot_for_date_walk_is_bounded() {
        let start = date(2025, 6, 2);
        assert!(slot_for_date(start, &MWF, date(2028, 6, 2)).is_none());
    }

    #[test]
    fn test_slot_index_round_trip() {
        for wpw in 1..=7 {
            for index in 0..(3 * WEEKS_PER_PHASE * wpw) {
                let slot = slot_at_index(index, wpw).unwrap();
                assert_eq!(absolute_index(slot, wpw), index);
            }
        }
    }

    #[test]
    fn test_slot_at_index_bounds() {
        // Three phases at 3/week = 36 slots; index 36 is past the end
        assert!(slot_at_index(36, 3).is_none());
        assert!(slot_at_index(-1, 3).is_none());
        assert!(slot_at_index(0, 0).is_none());

        let last = slot_at_index(35, 3).unwrap();
        assert_eq!((last.phase, last.week, last.day), (Phase::Ssp, 4, 3));
    }
}
