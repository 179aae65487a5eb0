//! Engine settings loaded from TOML.
//!
//! ```toml
//! [undo]
//! max_depth = 200
//!
//! [modifier]
//! commit_policy = "atomic"
//!
//! [compound]
//! undo_order = "reverse"
//! failure_policy = "stop"
//! ```

use std::path::Path;

use plugwork_core::{DEFAULT_MAX_UNDO, FailurePolicy, UndoOrder};
use serde::Deserialize;

use crate::modifier::CommitPolicy;

/// Top-level engine configuration. Every section and field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub undo: UndoConfig,
    pub modifier: ModifierConfig,
    pub compound: CompoundConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Oldest entries are dropped beyond this many.
    pub max_depth: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_UNDO,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModifierConfig {
    pub commit_policy: CommitPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompoundConfig {
    pub undo_order: UndoOrder,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Loads a config from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    EngineConfig::from_toml(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Loads a config, falling back to the defaults if the file is missing or
/// malformed.
pub fn load_or_default(path: &Path) -> EngineConfig {
    match load_config(path) {
        Ok(config) => {
            log::info!(
                "Loaded engine config from {} (undo depth {}, {:?} commits)",
                path.display(),
                config.undo.max_depth,
                config.modifier.commit_policy
            );
            config
        }
        Err(e) => {
            log::warn!("No engine config ({e}), using defaults");
            EngineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.undo.max_depth, DEFAULT_MAX_UNDO);
        assert_eq!(config.compound.undo_order, UndoOrder::Reverse);
    }

    #[test]
    fn sections_override_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [undo]
            max_depth = 5

            [modifier]
            commit_policy = "atomic"

            [compound]
            undo_order = "forward"
            failure_policy = "stop"
            "#,
        )
        .unwrap();
        assert_eq!(config.undo.max_depth, 5);
        assert_eq!(config.modifier.commit_policy, CommitPolicy::Atomic);
        assert_eq!(config.compound.undo_order, UndoOrder::Forward);
        assert_eq!(config.compound.failure_policy, FailurePolicy::Stop);
    }

    #[test]
    fn unknown_policy_is_an_error() {
        assert!(EngineConfig::from_toml("[modifier]\ncommit_policy = \"sometimes\"").is_err());
    }

    #[test]
    fn missing_file_falls_back() {
        let path = Path::new("/nonexistent/plugwork.toml");
        assert!(matches!(load_config(path), Err(ConfigError::Read { .. })));
        assert_eq!(load_or_default(path), EngineConfig::default());
    }
}
