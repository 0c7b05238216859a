//! Runtime configuration loaded from TOML with environment overrides.

use crate::core::cache::default_cache_dir;
use crate::error::{FantasyCriticError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "FANTASY_CRITIC_CONFIG";
pub const DATABASE_ENV_VAR: &str = "FANTASY_CRITIC_DB";

/// ~/.config/fantasy-critic/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fantasy-critic")
        .join("config.toml")
}

/// ~/.local/share/fantasy-critic/fantasy-critic.db
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fantasy-critic")
        .join("fantasy-critic.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub cache_dir: PathBuf,
    pub log_level: String,
    pub opencritic_base_url: String,
    pub master_game_cache_capacity: usize,
    /// Seconds between scheduled special-auction and Royale runs.
    pub schedule_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cache_dir: default_cache_dir(),
            log_level: "info".to_string(),
            opencritic_base_url: "https://api.opencritic.com/api".to_string(),
            master_game_cache_capacity: 5000,
            schedule_interval_secs: 600,
        }
    }
}

impl Config {
    /// Load from `FANTASY_CRITIC_CONFIG` or the default path. A missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        let mut config = if path.exists() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(db) = std::env::var(DATABASE_ENV_VAR) {
            if !db.trim().is_empty() {
                self.database_path = PathBuf::from(db);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule_interval_secs == 0 {
            return Err(FantasyCriticError::Config {
                message: "schedule_interval_secs must be greater than zero".to_string(),
            });
        }
        if self.master_game_cache_capacity == 0 {
            return Err(FantasyCriticError::Config {
                message: "master_game_cache_capacity must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config =
            Config::parse_toml("log_level = \"debug\"\nschedule_interval_secs = 60\n").unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.schedule_interval_secs, 60);
        assert_eq!(config.master_game_cache_capacity, 5000);
    }

    #[test]
    fn test_invalid_toml_is_config_parse_error() {
        let err = Config::parse_toml("schedule_interval_secs = \"often\"").unwrap_err();
        assert!(matches!(err, FantasyCriticError::ConfigParse(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "database_path = \"/tmp/fc.db\"\n").unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/fc.db"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config {
            schedule_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FantasyCriticError::Config { .. })
        ));
    }

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("fantasy-critic/config.toml"));
        assert!(default_database_path().ends_with("fantasy-critic/fantasy-critic.db"));
    }
}
