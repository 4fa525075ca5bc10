use chrono::{DateTime, Utc};

use super::DomainStore;
use crate::error::{CoreError, EntityKind, Result};
use crate::events::Event;
use crate::habits::{Habit, HabitPatch, NewHabit};

impl DomainStore {
    pub fn create_habit(&mut self, new: NewHabit) -> Result<String> {
        new.validate()?;
        let habit = new.build(false);
        let id = habit.id.clone();

        let mut next = self.draft();
        next.habits.push(habit);
        self.publish(next, Event::HabitCreated { habit_id: id.clone() });
        Ok(id)
    }

    pub fn update_habit(&mut self, habit_id: &str, patch: HabitPatch) -> Result<()> {
        let mut next = self.draft();
        habit_mut(&mut next.habits, habit_id)?.apply(patch)?;
        self.publish(
            next,
            Event::HabitUpdated {
                habit_id: habit_id.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove_habit(&mut self, habit_id: &str) -> Result<()> {
        let mut next = self.draft();
        let index = next
            .habits
            .iter()
            .position(|h| h.id == habit_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Habit, habit_id))?;
        next.habits.remove(index);
        self.publish(
            next,
            Event::HabitRemoved {
                habit_id: habit_id.to_string(),
            },
        );
        Ok(())
    }

    /// Flip the completion for the day of `date`. Returns whether that day
    /// is now completed.
    pub fn toggle_habit(&mut self, habit_id: &str, date: DateTime<Utc>) -> Result<bool> {
        let credit = self.config.habits.minutes_per_completion;
        let mut next = self.draft();
        let habit = habit_mut(&mut next.habits, habit_id)?;
        let completed = habit.toggle(date, credit);
        let consecutive_days = habit.consecutive_days;

        self.publish(
            next,
            Event::HabitToggled {
                habit_id: habit_id.to_string(),
                completed,
                consecutive_days,
            },
        );
        Ok(completed)
    }
}

fn habit_mut<'a>(habits: &'a mut [Habit], id: &str) -> Result<&'a mut Habit> {
    habits
        .iter_mut()
        .find(|h| h.id == id)
        .ok_or_else(|| CoreError::not_found(EntityKind::Habit, id))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::super::{Collaborators, DomainStore};
    use crate::error::{CoreError, ValidationError};
    use crate::habits::{HabitCategory, HabitFrequency, HabitPatch, HabitPriority, NewHabit};
    use crate::storage::Config;

    fn store() -> DomainStore {
        let mut config = Config::default();
        config.habits.seed_suggestions = false;
        DomainStore::new(config, Collaborators::in_memory())
    }

    fn meditate() -> NewHabit {
        NewHabit {
            name: "Meditate".into(),
            description: "Ten minutes".into(),
            category: HabitCategory::Health,
            frequency: HabitFrequency::Daily,
            custom_days: Vec::new(),
            priority: HabitPriority::High,
        }
    }

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 8, 0, 0).unwrap()
    }

    #[test]
    fn streak_counts_longest_run() {
        let mut store = store();
        let id = store.create_habit(meditate()).unwrap();
        for d in [1, 2, 3, 5, 6] {
            assert!(store.toggle_habit(&id, day(d)).unwrap());
        }
        let habit = store.state().habit(&id).unwrap();
        assert_eq!(habit.consecutive_days, 3);
        assert_eq!(habit.total_minutes, 5 * 15);
    }

    #[test]
    fn untoggling_breaks_the_run_but_keeps_minutes() {
        let mut store = store();
        let id = store.create_habit(meditate()).unwrap();
        for d in [1, 2, 3] {
            store.toggle_habit(&id, day(d)).unwrap();
        }
        assert!(!store.toggle_habit(&id, day(2)).unwrap());

        let habit = store.state().habit(&id).unwrap();
        assert_eq!(habit.consecutive_days, 1);
        assert_eq!(habit.total_minutes, 45);
        assert!(!habit.is_completed_on(day(2).date_naive()));
    }

    #[test]
    fn update_validates_before_applying() {
        let mut store = store();
        let id = store.create_habit(meditate()).unwrap();
        let patch = HabitPatch {
            name: Some(String::new()),
            priority: Some(HabitPriority::Low),
            ..Default::default()
        };
        assert!(matches!(
            store.update_habit(&id, patch),
            Err(CoreError::Validation(ValidationError::MissingField("name")))
        ));
        assert_eq!(store.state().habit(&id).unwrap().priority, HabitPriority::High);

        let patch = HabitPatch {
            frequency: Some(HabitFrequency::Custom),
            custom_days: Some(vec![0, 6]),
            ..Default::default()
        };
        store.update_habit(&id, patch).unwrap();
        assert_eq!(store.state().habit(&id).unwrap().custom_days, vec![0, 6]);
    }

    #[test]
    fn missing_habit_is_reported() {
        let mut store = store();
        assert!(store.toggle_habit("habit-missing", day(1)).is_err());
        assert!(store.update_habit("habit-missing", HabitPatch::default()).is_err());
        assert!(store.remove_habit("habit-missing").is_err());
    }

    #[test]
    fn user_habits_are_not_ai_suggested() {
        let mut store = store();
        let id = store.create_habit(meditate()).unwrap();
        assert!(!store.state().habit(&id).unwrap().ai_suggested);
        store.remove_habit(&id).unwrap();
        assert!(store.state().habits.is_empty());
    }
}
