use margin_engine::EditorSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    Read {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    Parse {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value in config file at {config_path}: {message}")]
    Invalid {
        config_path: PathBuf,
        message: String,
    },
}

fn default_save_interval_ms() -> u64 {
    1000
}

fn default_ai_author() -> String {
    "AI".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one JSON file per page
    pub pages_path: PathBuf,
    /// Idle time after the last edit before the page is saved
    #[serde(default = "default_save_interval_ms")]
    pub save_interval_ms: u64,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_ai_author")]
    pub ai_author: String,
}

impl Config {
    pub fn new(pages_path: impl Into<PathBuf>) -> Self {
        Self {
            pages_path: pages_path.into(),
            save_interval_ms: default_save_interval_ms(),
            read_only: false,
            ai_author: default_ai_author(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        if config.save_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                config_path: config_path.to_path_buf(),
                message: "save_interval_ms must be greater than zero".to_string(),
            });
        }

        // Expand shell variables and tilde in the pages directory
        config.pages_path = Self::expand_path(&config.pages_path).unwrap_or(config.pages_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/margin");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Settings for an editing session
    pub fn editor_settings(&self) -> EditorSettings {
        EditorSettings {
            save_interval: Duration::from_millis(self.save_interval_ms),
            read_only: self.read_only,
            ai_author: self.ai_author.clone(),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}
