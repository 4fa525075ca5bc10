//! Global mode and the UI behaviour derived from it.
//!
//! [`ModeEffects`] is never stored. It is recomputed from the mode slice on
//! every read, so it cannot go stale. The sleep hint cycle itself lives in
//! the store, which owns the timers.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Productivity,
    Focus,
    Sleep,
}

impl Mode {
    pub fn banner(self) -> Option<&'static str> {
        match self {
            Mode::Normal => None,
            Mode::Productivity => Some("Productivity mode: tips are on, let's get things done."),
            Mode::Focus => Some("Focus mode: only high-priority notifications will reach you."),
            Mode::Sleep => Some("Sleep mode: input is paused. Rest well."),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Productivity => "productivity",
            Mode::Focus => "focus",
            Mode::Sleep => "sleep",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Mode::Normal),
            "productivity" => Ok(Mode::Productivity),
            "focus" => Ok(Mode::Focus),
            "sleep" => Ok(Mode::Sleep),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

/// Stored part of the mode slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeSlice {
    pub mode: Mode,
    /// Last hint drawn during sleep mode.
    pub floating_message: Option<String>,
    pub show_floating_message: bool,
}

/// Behaviour the UI derives from the current mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeEffects {
    pub is_input_enabled: bool,
    pub current_message: Option<String>,
    pub is_focus_mode: bool,
    pub is_productivity_mode: bool,
    pub is_sleep_mode: bool,
    pub show_productivity_tips: bool,
    /// [`PRODUCTIVITY_TIPS`] in productivity mode, empty otherwise.
    pub productivity_tips: Vec<String>,
    pub suppress_low_priority_notifications: bool,
    pub floating_message: Option<String>,
    pub show_floating_message: bool,
}

impl ModeEffects {
    pub fn derive(slice: &ModeSlice) -> Self {
        let mode = slice.mode;
        Self {
            is_input_enabled: mode != Mode::Sleep,
            current_message: mode.banner().map(str::to_string),
            is_focus_mode: mode == Mode::Focus,
            is_productivity_mode: mode == Mode::Productivity,
            is_sleep_mode: mode == Mode::Sleep,
            show_productivity_tips: mode == Mode::Productivity,
            productivity_tips: if mode == Mode::Productivity {
                PRODUCTIVITY_TIPS.iter().map(|t| t.to_string()).collect()
            } else {
                Vec::new()
            },
            suppress_low_priority_notifications: mode == Mode::Focus,
            floating_message: slice.floating_message.clone(),
            show_floating_message: mode == Mode::Sleep && slice.show_floating_message,
        }
    }

    /// Whether a notification of `priority` should be shown right now.
    pub fn allows_notification(&self, priority: NotificationPriority) -> bool {
        !self.suppress_low_priority_notifications || priority == NotificationPriority::High
    }
}

/// Hints shown one at a time while sleep mode is active.
pub const SLEEP_MESSAGES: [&str; 5] = [
    "Your mind files away today's lessons while you rest.",
    "Breathe slowly. Nothing needs your attention right now.",
    "Tomorrow's ideas grow from tonight's sleep.",
    "Let go of the to-do list; it will wait for you.",
    "Rest is part of the work.",
];

/// Tips listed while productivity mode is active.
pub const PRODUCTIVITY_TIPS: [&str; 3] = [
    "Pick one task and close everything unrelated to it.",
    "Work in 25-minute blocks with short breaks.",
    "Write down distractions instead of acting on them.",
];

pub fn pick_sleep_message<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SLEEP_MESSAGES.choose(rng).copied().unwrap_or(SLEEP_MESSAGES[0])
}
