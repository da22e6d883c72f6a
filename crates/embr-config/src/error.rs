//! Errors for repository configuration loading.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("core error: {0}")]
    Core(#[from] embr_core::EmbrError),
}

impl From<ConfigError> for embr_core::EmbrError {
    fn from(err: ConfigError) -> Self {
        embr_core::EmbrError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
