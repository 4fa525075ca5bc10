use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Subcommand;
use mindforge_core::habits::{HabitCategory, HabitFrequency, HabitPriority};
use mindforge_core::NewHabit;
use serde_json::json;

use super::{open_store, parse_name, print_json, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Add a habit
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "health", value_parser = parse_name::<HabitCategory>)]
        category: HabitCategory,
        #[arg(long, default_value = "daily", value_parser = parse_name::<HabitFrequency>)]
        frequency: HabitFrequency,
        /// Weekdays for custom habits, 0 = Sunday (e.g. --days 1,3,5)
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        #[arg(long, default_value = "medium", value_parser = parse_name::<HabitPriority>)]
        priority: HabitPriority,
    },
    /// List habits as JSON
    List,
    /// Toggle completion for a day (default: today)
    Toggle {
        id: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Remove a habit
    Remove {
        id: String,
    },
}

pub fn run(action: HabitAction) -> CliResult {
    let (db, mut store) = open_store()?;

    match action {
        HabitAction::Add {
            name,
            description,
            category,
            frequency,
            days,
            priority,
        } => {
            let id = store.create_habit(NewHabit {
                name,
                description,
                category,
                frequency,
                custom_days: days,
                priority,
            })?;
            print_json(&store.state().habit(&id))?;
        }
        HabitAction::List => {
            print_json(&store.state().habits)?;
        }
        HabitAction::Toggle { id, date } => {
            let when = match date {
                Some(day) => Utc.from_utc_datetime(&day.and_time(NaiveTime::default())),
                None => Utc::now(),
            };
            let completed = store.toggle_habit(&id, when)?;
            let streak = store.state().habit(&id).map_or(0, |h| h.consecutive_days);
            print_json(&json!({
                "habit_id": id,
                "completed": completed,
                "consecutive_days": streak,
            }))?;
        }
        HabitAction::Remove { id } => {
            store.remove_habit(&id)?;
            print_json(&json!({ "type": "habit_removed", "habit_id": id }))?;
        }
    }

    store.flush(&db)?;
    Ok(())
}
