use crate::domain::{config::SerialTalkerConfig, error::{SerialTalkerError, SerialTalkerResult}};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the per-user configuration file
    pub fn new() -> SerialTalkerResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path()?,
        })
    }

    /// Manager for an explicit configuration file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load_config(&self) -> SerialTalkerResult<SerialTalkerConfig> {
        if !self.config_path.exists() {
            debug!("No configuration at {}, using defaults", self.config_path.display());
            return Ok(SerialTalkerConfig::default());
        }
        self.load_config_from_path(&self.config_path)
    }

    /// Save configuration, creating the parent directory if needed
    pub fn save_config(&self, config: &SerialTalkerConfig) -> SerialTalkerResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SerialTalkerError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }
        self.save_config_to_path(&self.config_path, config)
    }

    /// Write a default configuration file; refuses to overwrite
    pub fn init_config(&self) -> SerialTalkerResult<()> {
        if self.config_path.exists() {
            return Err(SerialTalkerError::Config {
                message: format!("Configuration already exists at {}", self.config_path.display()),
            });
        }
        self.save_config(&SerialTalkerConfig::default())
    }

    /// Record the port of the last successful connection
    pub fn remember_last_port(&self, config: &mut SerialTalkerConfig, port: &str) -> SerialTalkerResult<()> {
        if config.global.last_port.as_deref() == Some(port) {
            return Ok(());
        }
        config.global.last_port = Some(port.to_string());
        self.save_config(config)
    }

    fn default_config_path() -> SerialTalkerResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| SerialTalkerError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("serialtalker").join("config.toml"))
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> SerialTalkerResult<SerialTalkerConfig> {
        let content = fs::read_to_string(path).map_err(|e| SerialTalkerError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| SerialTalkerError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &SerialTalkerConfig) -> SerialTalkerResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| SerialTalkerError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| SerialTalkerError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
