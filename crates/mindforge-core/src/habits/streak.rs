//! Streak calculator.
//!
//! The streak is the longest run of calendar-consecutive completed days in a
//! log, regardless of where that run sits. It is what badges are awarded on,
//! so a broken run today does not erase an earlier, longer one.

use chrono::NaiveDate;

use super::CompletionEntry;

/// Length of the longest run of consecutive completed days.
///
/// Input order does not matter; several entries on the same day count once.
pub fn longest_streak(log: &[CompletionEntry]) -> u32 {
    let mut days: Vec<NaiveDate> = log
        .iter()
        .filter(|entry| entry.completed)
        .map(|entry| entry.date.date_naive())
        .collect();
    days.sort_unstable();
    days.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous.and_then(|p| p.succ_opt()) {
            Some(next) if next == day => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}
