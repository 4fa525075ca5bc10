//! Gamified training: sessions made of ordered blocks, scored per block and
//! rolled up into experience and levels.
//!
//! ## Session State Transitions
//!
//! ```text
//! Pending -> InProgress -> Completed
//! ```
//!
//! A session is `Completed` exactly when every block is completed.

mod achievements;
pub mod leveling;

pub use achievements::{default_achievements, unlock_reached, Achievement};
pub use leveling::{apply_experience, LevelOutcome, LevelState};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind, TransitionError, ValidationError};
use crate::ingest::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionLevel {
    Initial,
    Intermediate,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Summary,
    Reasoning,
    Simulation,
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingBlock {
    pub id: String,
    pub kind: BlockKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub options: Vec<BlockOption>,
    /// Training time credited when the block is completed.
    pub minutes: u32,
    pub completed: bool,
    /// 0..=100
    pub score: Option<u8>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: String,
    pub title: String,
    pub level: SessionLevel,
    pub state: SessionState,
    pub blocks: Vec<TrainingBlock>,
    /// Document this session was generated from.
    pub source_document_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for one block of a new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlock {
    pub kind: BlockKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub options: Vec<NewOption>,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOption {
    pub text: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Input for a manually created session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub title: String,
    pub level: SessionLevel,
    pub blocks: Vec<NewBlock>,
}

/// What completing a block did to its session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockCompletion {
    pub score: Option<u8>,
    pub minutes: u32,
    pub progress_pct: f64,
    pub session_completed: bool,
}

impl NewSession {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.blocks.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "blocks",
                message: "a session needs at least one block".into(),
            });
        }
        for block in &self.blocks {
            let correct = block.options.iter().filter(|o| o.is_correct).count();
            let needs_options = block.kind == BlockKind::Reasoning;
            if (needs_options || !block.options.is_empty()) && correct != 1 {
                return Err(ValidationError::InvalidValue {
                    field: "options",
                    message: format!(
                        "block '{}' must have exactly one correct option, found {correct}",
                        block.title
                    ),
                });
            }
        }
        Ok(())
    }

    /// Materialize with fresh ids. Call [`validate`](Self::validate) first.
    pub fn build(self, source_document_id: Option<String>) -> TrainingSession {
        let blocks = self
            .blocks
            .into_iter()
            .map(|b| TrainingBlock {
                id: format!("block-{}", uuid::Uuid::new_v4()),
                kind: b.kind,
                title: b.title,
                content: b.content,
                options: b
                    .options
                    .into_iter()
                    .enumerate()
                    .map(|(i, o)| BlockOption {
                        id: format!("opt-{}", i + 1),
                        text: o.text,
                        is_correct: o.is_correct,
                        explanation: o.explanation,
                    })
                    .collect(),
                minutes: b.minutes,
                completed: false,
                score: None,
                completed_at: None,
            })
            .collect();

        TrainingSession {
            id: format!("session-{}", uuid::Uuid::new_v4()),
            title: self.title,
            level: self.level,
            state: SessionState::Pending,
            blocks,
            source_document_id,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

impl TrainingSession {
    pub fn completed_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.completed).count()
    }

    /// 0.0 .. 100.0, computed from the blocks on every read.
    pub fn progress_pct(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        self.completed_blocks() as f64 / self.blocks.len() as f64 * 100.0
    }

    pub fn block(&self, block_id: &str) -> Option<&TrainingBlock> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    /// Mark a block completed with an optional 0..=100 score.
    pub fn complete_block(
        &mut self,
        block_id: &str,
        score: Option<u8>,
    ) -> Result<BlockCompletion, CoreError> {
        if let Some(s) = score {
            if s > 100 {
                return Err(ValidationError::InvalidValue {
                    field: "score",
                    message: format!("{s} is outside 0..=100"),
                }
                .into());
            }
        }

        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == block_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Block, block_id))?;
        if block.completed {
            return Err(TransitionError::BlockAlreadyCompleted(block_id.to_string()).into());
        }

        let now = Utc::now();
        block.completed = true;
        block.score = score;
        block.completed_at = Some(now);
        let minutes = block.minutes;

        let session_completed = self.completed_blocks() == self.blocks.len();
        if session_completed {
            self.state = SessionState::Completed;
            self.completed_at = Some(now);
        } else {
            self.state = SessionState::InProgress;
        }

        Ok(BlockCompletion {
            score,
            minutes,
            progress_pct: self.progress_pct(),
            session_completed,
        })
    }

    /// Score a block by the chosen option (100 if correct, else 0) and
    /// complete it.
    pub fn answer_block(
        &mut self,
        block_id: &str,
        option_id: &str,
    ) -> Result<BlockCompletion, CoreError> {
        let block = self
            .block(block_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Block, block_id))?;
        let option = block
            .options
            .iter()
            .find(|o| o.id == option_id)
            .ok_or_else(|| CoreError::not_found(EntityKind::BlockOption, option_id))?;
        let score = if option.is_correct { 100 } else { 0 };
        self.complete_block(block_id, Some(score))
    }
}

/// Three-block reflection / simulation / analysis template for a completed
/// document.
pub fn session_for_document(document: &Document) -> NewSession {
    let main_topic = document
        .topics
        .first()
        .cloned()
        .unwrap_or_else(|| document.name.clone());
    let keywords = if document.keywords.is_empty() {
        "its key ideas".to_string()
    } else {
        document.keywords.join(", ")
    };

    NewSession {
        title: format!("Training: {}", document.name),
        level: SessionLevel::Initial,
        blocks: vec![
            NewBlock {
                kind: BlockKind::Summary,
                title: "Reflection".into(),
                content: format!(
                    "Summarize what '{}' taught you about {main_topic}, touching on {keywords}.",
                    document.name
                ),
                options: Vec::new(),
                minutes: 5,
            },
            NewBlock {
                kind: BlockKind::Simulation,
                title: "Simulation".into(),
                content: format!(
                    "Imagine applying {main_topic} to a decision you face this week. Walk through it step by step."
                ),
                options: Vec::new(),
                minutes: 10,
            },
            NewBlock {
                kind: BlockKind::Reasoning,
                title: "Analysis".into(),
                content: format!("Which theme is central to '{}'?", document.name),
                options: vec![
                    NewOption {
                        text: main_topic.clone(),
                        is_correct: true,
                        explanation: format!("The document is chiefly about {main_topic}."),
                    },
                    NewOption {
                        text: "Unrelated trivia".into(),
                        is_correct: false,
                        explanation: "Nothing in the document points there.".into(),
                    },
                    NewOption {
                        text: "None of the above".into(),
                        is_correct: false,
                        explanation: format!("One of the options, {main_topic}, is central."),
                    },
                ],
                minutes: 5,
            },
        ],
    }
}

/// Singleton leveling and activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub level: u32,
    pub experience: u64,
    pub experience_needed: u64,
    pub sessions_completed: u32,
    /// Minutes.
    pub total_training_time: u64,
    pub achievements: Vec<Achievement>,
}

/// Result of feeding experience into [`TrainingProgress`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceGain {
    pub levels_gained: u32,
    pub unlocked: Vec<String>,
}

impl TrainingProgress {
    pub fn new(experience_needed: u64) -> Self {
        let initial = LevelState::initial(experience_needed);
        Self {
            level: initial.level,
            experience: initial.experience,
            experience_needed: initial.experience_needed,
            sessions_completed: 0,
            total_training_time: 0,
            achievements: default_achievements(),
        }
    }

    pub fn level_state(&self) -> LevelState {
        LevelState {
            level: self.level,
            experience: self.experience,
            experience_needed: self.experience_needed,
        }
    }

    pub fn gain_experience(&mut self, gain: u64, growth: f64) -> ExperienceGain {
        let outcome = apply_experience(self.level_state(), gain, growth);
        self.level = outcome.state.level;
        self.experience = outcome.state.experience;
        self.experience_needed = outcome.state.experience_needed;
        let unlocked = unlock_reached(&mut self.achievements, self.level);
        ExperienceGain {
            levels_gained: outcome.levels_gained,
            unlocked,
        }
    }
}
