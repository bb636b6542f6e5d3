//! Error types for the settings crate.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading, saving or validating a canvas config.
///
/// File errors carry the path so the replay tool can report which file to
/// fix.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON or TOML, or does not match the schema.
    #[error("Malformed config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Cannot encode config: {0}")]
    Encode(String),

    /// A value is out of range. `key` is the dotted path, e.g. `zoom.step`.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// The extension is neither `.json` nor `.toml`.
    #[error("Unsupported config format for {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("No user config directory on this platform")]
    NoConfigDirectory,
}

impl SettingsError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        SettingsError::InvalidSetting {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        SettingsError::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        SettingsError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, err: impl std::fmt::Display) -> Self {
        SettingsError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Dotted key of an invalid setting.
    pub fn setting_key(&self) -> Option<&str> {
        match self {
            SettingsError::InvalidSetting { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
