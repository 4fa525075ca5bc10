//! TOML-based engine configuration.
//!
//! Holds the tunables of every slice:
//! - Ingestion ticker cadence, upload ceiling and accepted kinds
//! - Leveling constants
//! - Habit completion credit
//! - Sleep-mode hint cadence
//! - Simulated reply and connection-test delays
//! - Prompt share link base
//!
//! Configuration is stored at `~/.config/mindforge/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::ingest::DocumentKind;

/// Knowledge ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_allowed_kinds")]
    pub allowed_kinds: Vec<DocumentKind>,
    /// Generate a training session for every completed document.
    #[serde(default = "default_true")]
    pub auto_generate_sessions: bool,
    /// Add a synapse node for every completed document.
    #[serde(default = "default_true")]
    pub auto_link_nodes: bool,
}

/// Leveling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_experience_per_score_point")]
    pub experience_per_score_point: u64,
    #[serde(default = "default_initial_experience_needed")]
    pub initial_experience_needed: u64,
    #[serde(default = "default_threshold_growth")]
    pub threshold_growth: f64,
}

/// Habit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitConfig {
    #[serde(default = "default_minutes_per_completion")]
    pub minutes_per_completion: u32,
    #[serde(default = "default_true")]
    pub seed_suggestions: bool,
}

/// Mode scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeConfig {
    #[serde(default = "default_sleep_message_interval_ms")]
    pub sleep_message_interval_ms: u64,
    #[serde(default = "default_sleep_message_display_ms")]
    pub sleep_message_display_ms: u64,
    /// Fixed seed for hint selection; entropy when unset.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

/// API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsConfig {
    #[serde(default = "default_test_delay_ms")]
    pub test_delay_ms: u64,
}

/// Prompt library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/mindforge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub habits: HabitConfig,
    #[serde(default)]
    pub mode: ModeConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub connections: ConnectionsConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    500
}
fn default_progress_step() -> u8 {
    10
}
fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_allowed_kinds() -> Vec<DocumentKind> {
    DocumentKind::ALL.to_vec()
}
fn default_true() -> bool {
    true
}
fn default_experience_per_score_point() -> u64 {
    10
}
fn default_initial_experience_needed() -> u64 {
    1000
}
fn default_threshold_growth() -> f64 {
    1.5
}
fn default_minutes_per_completion() -> u32 {
    15
}
fn default_sleep_message_interval_ms() -> u64 {
    15_000
}
fn default_sleep_message_display_ms() -> u64 {
    5_000
}
fn default_reply_delay_ms() -> u64 {
    1_200
}
fn default_test_delay_ms() -> u64 {
    1_500
}
fn default_share_base_url() -> String {
    "https://mindforge.app/share/".into()
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            progress_step: default_progress_step(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_kinds: default_allowed_kinds(),
            auto_generate_sessions: true,
            auto_link_nodes: true,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            experience_per_score_point: default_experience_per_score_point(),
            initial_experience_needed: default_initial_experience_needed(),
            threshold_growth: default_threshold_growth(),
        }
    }
}

impl Default for HabitConfig {
    fn default() -> Self {
        Self {
            minutes_per_completion: default_minutes_per_completion(),
            seed_suggestions: true,
        }
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            sleep_message_interval_ms: default_sleep_message_interval_ms(),
            sleep_message_display_ms: default_sleep_message_display_ms(),
            rng_seed: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
        }
    }
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self {
            test_delay_ms: default_test_delay_ms(),
        }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            share_base_url: default_share_base_url(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                // Optional fields serialize as null; accept numbers, else strings.
                serde_json::Value::Null => match value.parse::<u64>() {
                    Ok(n) => serde_json::Value::Number(n.into()),
                    Err(_) if value == "none" => serde_json::Value::Null,
                    Err(_) => serde_json::Value::String(value.into()),
                },
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is absent.
    ///
    /// A file that parses but fails [`validate`](Self::validate) is rejected.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Flattened `key = value` listing of every leaf setting.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Reject values that would stall or break the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.ingestion.progress_step == 0 || self.ingestion.progress_step > 100 {
            return Err(invalid("ingestion.progress_step", "must be within 1..=100"));
        }
        if self.ingestion.tick_interval_ms == 0 {
            return Err(invalid("ingestion.tick_interval_ms", "must be positive"));
        }
        if self.training.initial_experience_needed == 0 {
            return Err(invalid("training.initial_experience_needed", "must be positive"));
        }
        if !(self.training.threshold_growth >= 1.0) {
            return Err(invalid("training.threshold_growth", "must be at least 1.0"));
        }
        if self.mode.sleep_message_interval_ms == 0 {
            return Err(invalid("mode.sleep_message_interval_ms", "must be positive"));
        }
        if self.mode.sleep_message_display_ms >= self.mode.sleep_message_interval_ms {
            return Err(invalid(
                "mode.sleep_message_display_ms",
                "must be shorter than mode.sleep_message_interval_ms",
            ));
        }
        if url::Url::parse(&self.prompts.share_base_url).is_err() {
            return Err(invalid("prompts.share_base_url", "must be an absolute URL"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.ingestion.progress_step, 10);
        assert_eq!(parsed.habits.minutes_per_completion, 15);
        assert_eq!(parsed.ingestion.allowed_kinds.len(), 5);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[ingestion]\ntick_interval_ms = 42\n").unwrap();
        assert_eq!(parsed.ingestion.tick_interval_ms, 42);
        assert_eq!(parsed.ingestion.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(parsed.training.initial_experience_needed, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("ingestion.progress_step").as_deref(), Some("10"));
        assert_eq!(cfg.get("training.threshold_growth").as_deref(), Some("1.5"));
        assert!(cfg.get("ingestion.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("ingestion.auto_generate_sessions", "false").unwrap();
        cfg.set("habits.minutes_per_completion", "20").unwrap();
        cfg.set("prompts.share_base_url", "https://example.com/p/").unwrap();
        cfg.set("mode.rng_seed", "7").unwrap();
        assert!(!cfg.ingestion.auto_generate_sessions);
        assert_eq!(cfg.habits.minutes_per_completion, 20);
        assert_eq!(cfg.prompts.share_base_url, "https://example.com/p/");
        assert_eq!(cfg.mode.rng_seed, Some(7));
    }

    #[test]
    fn set_accepts_kind_list_as_json() {
        let mut cfg = Config::default();
        cfg.set("ingestion.allowed_kinds", r#"["pdf","txt"]"#).unwrap();
        assert_eq!(
            cfg.ingestion.allowed_kinds,
            vec![DocumentKind::Pdf, DocumentKind::Txt]
        );
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("ingestion.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("ingestion.auto_link_nodes", "maybe").is_err());
        assert!(cfg.ingestion.auto_link_nodes);
    }

    #[test]
    fn set_rejects_values_that_fail_validation() {
        let mut cfg = Config::default();
        assert!(cfg.set("ingestion.progress_step", "0").is_err());
        assert!(cfg.set("mode.sleep_message_display_ms", "20000").is_err());
        assert_eq!(cfg.ingestion.progress_step, 10);
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let loaded = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(loaded.chat.reply_delay_ms, 1_200);

        let mut cfg = loaded;
        cfg.set("chat.reply_delay_ms", "300").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().chat.reply_delay_ms, 300);
    }

    #[test]
    fn load_rejects_file_that_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[mode]\nsleep_message_interval_ms = 0\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "mode.sleep_message_interval_ms"
        ));
    }

    #[test]
    fn unreadable_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xfe, 0x00]);
    }

    #[test]
    fn entries_lists_leaves() {
        let entries = Config::default().entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "mode.sleep_message_interval_ms" && v == "15000"));
    }
}
