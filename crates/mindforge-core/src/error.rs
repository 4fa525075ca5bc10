//! Core error types for mindforge-core.
//!
//! Every fallible store action returns [`CoreError`]. A failed action never
//! leaves a partial update behind and never notifies subscribers.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mindforge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before any state mutation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Mutation or lookup targeting an entity that does not exist
    #[error("Referential error: {0}")]
    Referential(#[from] ReferentialError),

    /// Illegal state machine transition
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Remote object storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Local database errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// File extension outside the accepted set
    #[error("Unsupported file type '{extension}' for '{name}'")]
    UnsupportedFileType { name: String, extension: String },

    /// Upload larger than the configured ceiling
    #[error("File '{name}' is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// Required field left empty
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// Value outside its allowed range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    /// Chat input is disabled in the current mode
    #[error("Input is disabled while sleep mode is active")]
    InputDisabled,
}

/// Referential integrity errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferentialError {
    /// No entity of the given kind has this id
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// Edge endpoint does not reference an existing node
    #[error("Edge endpoint '{missing}' does not reference an existing node")]
    DanglingEdge { missing: String },
}

/// Entity kinds, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Document,
    Session,
    Block,
    BlockOption,
    Node,
    Edge,
    Habit,
    Prompt,
    Connection,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Document => "Document",
            EntityKind::Session => "Training session",
            EntityKind::Block => "Training block",
            EntityKind::BlockOption => "Block option",
            EntityKind::Node => "Synapse node",
            EntityKind::Edge => "Synapse edge",
            EntityKind::Habit => "Habit",
            EntityKind::Prompt => "Prompt",
            EntityKind::Connection => "API connection",
        };
        f.write_str(name)
    }
}

/// State machine transition errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// Block has already been completed
    #[error("Block '{0}' is already completed")]
    BlockAlreadyCompleted(String),

    /// Document is not in a state that allows the requested action
    #[error("Document '{id}' cannot {action} while {state}")]
    Document {
        id: String,
        state: String,
        action: &'static str,
    },
}

/// Remote object storage errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Upload rejected or failed
    #[error("Upload of '{name}' failed: {message}")]
    UploadFailed { name: String, message: String },

    /// Remove failed
    #[error("Remove of '{url}' failed: {message}")]
    RemoveFailed { url: String, message: String },
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl CoreError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        CoreError::Referential(ReferentialError::NotFound {
            kind,
            id: id.into(),
        })
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::not_found(EntityKind::Habit, "habit-1");
        assert_eq!(
            err.to_string(),
            "Referential error: Habit 'habit-1' not found"
        );
    }

    #[test]
    fn file_too_large_message() {
        let err = ValidationError::FileTooLarge {
            name: "big.pdf".into(),
            size: 11,
            limit: 10,
        };
        assert!(err.to_string().contains("exceeding the 10 byte limit"));
    }
}
