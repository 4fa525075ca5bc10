use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A level milestone. `unlocked` never reverts once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Level at which this unlocks.
    pub level: u32,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl Achievement {
    fn seed(id: &str, title: &str, description: &str, level: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            level,
            unlocked: false,
            unlocked_at: None,
        }
    }
}

/// Achievements available at startup.
pub fn default_achievements() -> Vec<Achievement> {
    vec![
        Achievement::seed("first-steps", "First Steps", "Reach level 2", 2),
        Achievement::seed("curious-mind", "Curious Mind", "Reach level 3", 3),
        Achievement::seed("deep-thinker", "Deep Thinker", "Reach level 5", 5),
        Achievement::seed("master-of-self", "Master of Self", "Reach level 10", 10),
    ]
}

/// Unlock every achievement at or below `level`. Returns the newly unlocked
/// titles.
pub fn unlock_reached(achievements: &mut [Achievement], level: u32) -> Vec<String> {
    let now = Utc::now();
    achievements
        .iter_mut()
        .filter(|a| !a.unlocked && a.level <= level)
        .map(|a| {
            a.unlocked = true;
            a.unlocked_at = Some(now);
            a.title.clone()
        })
        .collect()
}
