use serde::{Deserialize, Serialize};

use crate::connections::ConnectionState;
use crate::ingest::DocumentState;
use crate::mode::Mode;

/// Every store mutation produces exactly one Event.
/// Subscribers receive it together with the snapshot it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // ── Ingestion ────────────────────────────────────────────────────
    DocumentUploaded {
        document_id: String,
        name: String,
        state: DocumentState,
    },
    DocumentProgress {
        document_id: String,
        progress: u8,
    },
    DocumentCompleted {
        document_id: String,
        topics: Vec<String>,
        /// Generated training session, when enabled.
        session_id: Option<String>,
        /// Generated synapse node, when enabled.
        node_id: Option<String>,
    },
    DocumentFailed {
        document_id: String,
        message: String,
    },
    DocumentUpdated {
        document_id: String,
    },
    DocumentRemoved {
        document_id: String,
    },

    // ── Training ─────────────────────────────────────────────────────
    SessionCreated {
        session_id: String,
    },
    SessionRemoved {
        session_id: String,
    },
    BlockCompleted {
        session_id: String,
        block_id: String,
        score: Option<u8>,
        progress_pct: f64,
        session_completed: bool,
        experience_gained: u64,
        level: u32,
        levels_gained: u32,
        /// Titles of achievements unlocked by this completion.
        unlocked: Vec<String>,
    },

    // ── Habits ───────────────────────────────────────────────────────
    HabitCreated {
        habit_id: String,
    },
    HabitUpdated {
        habit_id: String,
    },
    HabitToggled {
        habit_id: String,
        completed: bool,
        consecutive_days: u32,
    },
    HabitRemoved {
        habit_id: String,
    },

    // ── Synapse ──────────────────────────────────────────────────────
    NodeAdded {
        node_id: String,
    },
    NodeUpdated {
        node_id: String,
    },
    NodeRemoved {
        node_id: String,
        removed_edges: Vec<String>,
    },
    EdgeAdded {
        edge_id: String,
    },
    EdgeRemoved {
        edge_id: String,
    },

    // ── Prompts ──────────────────────────────────────────────────────
    PromptCreated {
        prompt_id: String,
    },
    PromptUpdated {
        prompt_id: String,
    },
    PromptRemoved {
        prompt_id: String,
    },
    PromptDuplicated {
        source_id: String,
        prompt_id: String,
    },
    PromptFavoriteToggled {
        prompt_id: String,
        is_favorite: bool,
    },
    PromptShared {
        prompt_id: String,
        share_link: String,
    },
    PromptUsed {
        prompt_id: String,
        use_count: u32,
    },

    // ── API connections ──────────────────────────────────────────────
    ConnectionCreated {
        connection_id: String,
    },
    ConnectionUpdated {
        connection_id: String,
    },
    ConnectionRemoved {
        connection_id: String,
    },
    ConnectionTested {
        connection_id: String,
        state: ConnectionState,
    },

    // ── Mode & conversation ──────────────────────────────────────────
    ModeChanged {
        from: Mode,
        to: Mode,
    },
    FloatingMessageShown {
        message: String,
    },
    FloatingMessageHidden,
    MessageSent {
        message_id: String,
    },
    ReplyReceived {
        message_id: String,
        in_reply_to: String,
    },

    // ── Store ────────────────────────────────────────────────────────
    StoreReset,
}
