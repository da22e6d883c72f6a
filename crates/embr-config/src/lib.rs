//! embr-config — loads `.embr/config` and layers environment variable
//! overrides on top, the way `otlp2parquet-config` layers environment
//! variables over its TOML file (here the on-disk format is the INI file
//! `spec.md` §6 fixes).

pub mod config;
pub mod env;
pub mod error;

pub use config::{load, CoreConfig, GitConfig, ModelConfig, RepoConfig, StorageConfig};
pub use error::{ConfigError, Result};
