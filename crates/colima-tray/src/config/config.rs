//! Configuration management for colima-tray.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{BehaviourConfig, EngineConfig, RuntimeConfig, TerminalConfig},
};

use colima_tray_core::{SupervisorSettings, Toolchain};

use std::{fs, io::Write, panic::Location, path::PathBuf, time::Duration};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// VM runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Container engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Terminal launcher for logs and shells.
    #[serde(default)]
    pub terminal: TerminalConfig,
    /// Application behaviour settings.
    #[serde(default)]
    pub behaviour: BehaviourConfig,
}

impl Config {
    /// Load configuration from disk, creating the default file if missing.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config = Self::parse(&contents)?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Parse and validate TOML; missing sections and keys take defaults.
    #[track_caller]
    pub fn parse(contents: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controllers cannot run with.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        let reason = if self.runtime.binary.trim().is_empty() {
            Some("runtime.binary must not be empty")
        } else if self.engine.binary.trim().is_empty() {
            Some("engine.binary must not be empty")
        } else if self.runtime.poll_interval_secs == 0 {
            Some("runtime.poll_interval_secs must be at least 1")
        } else if self.terminal.program.trim().is_empty() {
            Some("terminal.program must not be empty")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(AppError::ConfigError {
                reason: reason.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(contents.as_bytes())?;
        temp_file.sync_all()?;
        fs::rename(&temp_path, &config_path)?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Binaries and terminal launcher for the core.
    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            runtime: self.runtime.binary.clone(),
            engine: self.engine.binary.clone(),
            terminal: (&self.terminal).into(),
        }
    }

    /// Poll interval and queue depth for spawned controllers.
    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            poll_interval: Duration::from_secs(self.runtime.poll_interval_secs),
            ..SupervisorSettings::default()
        }
    }

    /// Container rescan period, `None` when rescanning is disabled.
    pub fn rescan_interval(&self) -> Option<Duration> {
        match self.engine.rescan_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Path of `config.toml`, creating its directory if needed.
    #[track_caller]
    pub fn config_path() -> AppResult<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("com", "colima-tray", "Colima-Tray").ok_or_else(|| {
                AppError::ConfigError {
                    reason: "Failed to get config directory".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }
}
