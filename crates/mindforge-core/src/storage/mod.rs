mod config;
pub mod database;
pub mod object_store;

pub use config::{
    ChatConfig, Config, ConnectionsConfig, HabitConfig, IngestionConfig, ModeConfig,
    PromptsConfig, TrainingConfig,
};
pub use database::Database;
pub use object_store::{MemoryObjectStore, ObjectStorage, UploadMetadata, UploadReceipt};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/mindforge[-dev]/` based on MINDFORGE_ENV.
///
/// Set MINDFORGE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MINDFORGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mindforge-dev")
    } else {
        base_dir.join("mindforge")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
