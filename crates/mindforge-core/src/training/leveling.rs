//! Leveling formula.
//!
//! Pure mapping from an experience gain to a new `(level, experience,
//! experience_needed)` triple. A gain large enough to cross several
//! thresholds cascades through all of them, so on return
//! `experience < experience_needed` always holds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    pub level: u32,
    pub experience: u64,
    pub experience_needed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelOutcome {
    pub state: LevelState,
    pub levels_gained: u32,
}

impl LevelState {
    pub fn initial(experience_needed: u64) -> Self {
        Self {
            level: 1,
            experience: 0,
            experience_needed: experience_needed.max(1),
        }
    }
}

/// Next threshold after a level-up, floored to whole points and never below
/// the current one.
pub fn next_threshold(experience_needed: u64, growth: f64) -> u64 {
    let grown = (experience_needed as f64 * growth).floor();
    if grown.is_finite() && grown >= experience_needed as f64 {
        grown as u64
    } else {
        experience_needed
    }
    .max(1)
}

/// Apply a non-negative `gain` to `current`.
pub fn apply_experience(current: LevelState, gain: u64, growth: f64) -> LevelOutcome {
    let mut state = current;
    state.experience_needed = state.experience_needed.max(1);
    state.experience = state.experience.saturating_add(gain);

    let mut levels_gained = 0;
    while state.experience >= state.experience_needed {
        state.experience -= state.experience_needed;
        state.level += 1;
        state.experience_needed = next_threshold(state.experience_needed, growth);
        levels_gained += 1;
    }

    LevelOutcome {
        state,
        levels_gained,
    }
}
