//! Engine configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for one engine instance
///
/// ```toml
/// resource_root_default = "assets"
/// entry_file = "main.spx"
/// main_package = "main"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Resource root used when the entry file does not name one in `run`
    pub resource_root_default: String,
    /// Base name of the entry file
    pub entry_file: String,
    /// Package name a file must declare to be part of the program
    pub main_package: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resource_root_default: "assets".to_string(),
            entry_file: "main.spx".to_string(),
            main_package: "main".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.resource_root_default, "assets");
        assert_eq!(config.entry_file, "main.spx");
        assert_eq!(config.main_package, "main");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("resource_root_default = \"res\"\n").unwrap();
        assert_eq!(config.resource_root_default, "res");
        assert_eq!(config.entry_file, "main.spx");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = EngineConfig::from_toml_str("entry = \"game.spx\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
