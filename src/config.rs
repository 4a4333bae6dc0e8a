//! Configuration for temp files, streams and logging.
//!
//! With the `config` feature the settings can be read from a TOML file:
//!
//! ```toml
//! [temp]
//! base = "/scratch/"
//! early_unlink = false
//!
//! [streams]
//! buffer_size = 4096
//! compression_level = 9
//!
//! [logging]
//! level = "debug"
//! log_files = ["train.log"]
//! valid_log_files = ["valid.log"]
//! ```
//!
//! Every section and key is optional and falls back to its default.

use crate::error::{FileStreamError, Result};
use crate::file_stream::{StreamOptions, TempFileOptions};
use crate::logging::LoggingConfig;
#[cfg(feature = "config")]
use std::path::{Path, PathBuf};

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct IoConfig {
    pub temp: TempFileOptions,
    pub streams: StreamOptions,
    pub logging: LoggingConfig,
}

impl IoConfig {
    /// Reject values the streams cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.streams.buffer_size == 0 {
            return Err(FileStreamError::config("streams.buffer_size must be positive"));
        }
        if self.streams.compression_level > 9 {
            return Err(FileStreamError::config(format!(
                "streams.compression_level must be 0-9, got {}",
                self.streams.compression_level
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "config")]
impl IoConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| FileStreamError::config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            crate::log_at!(
                debug,
                "[config] No configuration at '{}', using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            FileStreamError::file_error(
                format!("Failed to read configuration: {}", path.display()),
                e,
            )
        })?;
        Self::from_toml_str(&text)
    }

    /// `<config_dir>/marian-io/config.toml`, when the platform has one
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("marian-io").join("config.toml"))
    }

    /// Load `path` if given, else the default location, else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}
