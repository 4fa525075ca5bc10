//! Habit tracking with completion logs and streaks.

mod streak;

pub use streak::longest_streak;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitCategory {
    Health,
    Productivity,
    Learning,
    Emotional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    /// On the weekdays listed in `custom_days`.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub date: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: HabitCategory,
    pub frequency: HabitFrequency,
    /// 0=Sun ... 6=Sat, only meaningful for `Custom`.
    #[serde(default)]
    pub custom_days: Vec<u8>,
    pub start_date: NaiveDate,
    pub completion_log: Vec<CompletionEntry>,
    /// Recomputed from `completion_log` on every toggle.
    pub consecutive_days: u32,
    pub total_minutes: u32,
    pub priority: HabitPriority,
    pub ai_suggested: bool,
}

/// Input for a new habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub category: HabitCategory,
    pub frequency: HabitFrequency,
    #[serde(default)]
    pub custom_days: Vec<u8>,
    pub priority: HabitPriority,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<HabitCategory>,
    pub frequency: Option<HabitFrequency>,
    pub custom_days: Option<Vec<u8>>,
    pub priority: Option<HabitPriority>,
}

fn validate_schedule(frequency: HabitFrequency, custom_days: &[u8]) -> Result<(), ValidationError> {
    if custom_days.iter().any(|d| *d > 6) {
        return Err(ValidationError::InvalidValue {
            field: "custom_days",
            message: "weekdays are numbered 0 (Sunday) to 6 (Saturday)".into(),
        });
    }
    if frequency == HabitFrequency::Custom && custom_days.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "custom_days",
            message: "a custom habit needs at least one weekday".into(),
        });
    }
    Ok(())
}

impl NewHabit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        validate_schedule(self.frequency, &self.custom_days)
    }

    pub fn build(self, ai_suggested: bool) -> Habit {
        Habit {
            id: format!("habit-{}", uuid::Uuid::new_v4()),
            name: self.name,
            description: self.description,
            category: self.category,
            frequency: self.frequency,
            custom_days: self.custom_days,
            start_date: Utc::now().date_naive(),
            completion_log: Vec::new(),
            consecutive_days: 0,
            total_minutes: 0,
            priority: self.priority,
            ai_suggested,
        }
    }
}

impl Habit {
    /// Apply a patch, validating the result before anything changes.
    pub fn apply(&mut self, patch: HabitPatch) -> Result<(), ValidationError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::MissingField("name"));
        }
        let frequency = patch.frequency.unwrap_or(self.frequency);
        let custom_days = patch.custom_days.as_deref().unwrap_or(&self.custom_days);
        validate_schedule(frequency, custom_days)?;

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(custom_days) = patch.custom_days {
            self.custom_days = custom_days;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        self.frequency = frequency;
        Ok(())
    }

    pub fn is_completed_on(&self, day: NaiveDate) -> bool {
        self.completion_log
            .iter()
            .any(|e| e.completed && e.date.date_naive() == day)
    }

    /// Flip the completion for the calendar day of `date`.
    ///
    /// Each transition to completed credits `minutes_credit`; un-completing
    /// does not take it back. Returns whether the day is now completed.
    pub fn toggle(&mut self, date: DateTime<Utc>, minutes_credit: u32) -> bool {
        let day = date.date_naive();
        let completed = match self
            .completion_log
            .iter_mut()
            .find(|e| e.date.date_naive() == day)
        {
            Some(entry) => {
                entry.completed = !entry.completed;
                entry.date = date;
                entry.completed
            }
            None => {
                self.completion_log.push(CompletionEntry {
                    date,
                    completed: true,
                });
                true
            }
        };

        if completed {
            self.total_minutes = self.total_minutes.saturating_add(minutes_credit);
        }
        self.consecutive_days = longest_streak(&self.completion_log);
        completed
    }
}

/// Habits suggested to every new user.
pub fn suggested_habits() -> Vec<NewHabit> {
    vec![
        NewHabit {
            name: "Morning reflection".into(),
            description: "Write three lines about what you want from today.".into(),
            category: HabitCategory::Emotional,
            frequency: HabitFrequency::Daily,
            custom_days: Vec::new(),
            priority: HabitPriority::High,
        },
        NewHabit {
            name: "Review one note".into(),
            description: "Revisit a note from your knowledge base and add one connection.".into(),
            category: HabitCategory::Learning,
            frequency: HabitFrequency::Daily,
            custom_days: Vec::new(),
            priority: HabitPriority::Medium,
        },
        NewHabit {
            name: "Deep work block".into(),
            description: "Ninety minutes without notifications.".into(),
            category: HabitCategory::Productivity,
            frequency: HabitFrequency::Custom,
            custom_days: vec![1, 3, 5],
            priority: HabitPriority::Medium,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn habit() -> Habit {
        NewHabit {
            name: "Stretch".into(),
            description: String::new(),
            category: HabitCategory::Health,
            frequency: HabitFrequency::Daily,
            custom_days: Vec::new(),
            priority: HabitPriority::Low,
        }
        .build(false)
    }

    fn day(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, hour, 0, 0).unwrap()
    }

    #[test]
    fn toggle_credits_minutes_and_recomputes_streak() {
        let mut h = habit();
        for d in [1, 2, 3, 5, 6] {
            assert!(h.toggle(day(d, 8), 15));
        }
        assert_eq!(h.consecutive_days, 3);
        assert_eq!(h.total_minutes, 75);
    }

    #[test]
    fn toggling_same_day_flips_without_refund() {
        let mut h = habit();
        assert!(h.toggle(day(1, 8), 15));
        assert!(!h.toggle(day(1, 20), 15));
        assert_eq!(h.completion_log.len(), 1);
        assert_eq!(h.consecutive_days, 0);
        assert_eq!(h.total_minutes, 15);

        assert!(h.toggle(day(1, 21), 15));
        assert_eq!(h.total_minutes, 30);
        assert!(h.is_completed_on(day(1, 0).date_naive()));
    }

    #[test]
    fn custom_frequency_needs_days() {
        let mut new = suggested_habits().remove(2);
        new.custom_days.clear();
        assert!(new.validate().is_err());
        new.custom_days = vec![7];
        assert!(new.validate().is_err());
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut h = habit();
        let bad = HabitPatch {
            name: Some("Yoga".into()),
            frequency: Some(HabitFrequency::Custom),
            ..Default::default()
        };
        assert!(h.apply(bad).is_err());
        assert_eq!(h.name, "Stretch");

        let good = HabitPatch {
            name: Some("Yoga".into()),
            frequency: Some(HabitFrequency::Custom),
            custom_days: Some(vec![0, 6]),
            ..Default::default()
        };
        h.apply(good).unwrap();
        assert_eq!(h.name, "Yoga");
        assert_eq!(h.custom_days, vec![0, 6]);
    }

    #[test]
    fn suggestions_are_valid() {
        for s in suggested_habits() {
            s.validate().unwrap();
        }
    }
}
