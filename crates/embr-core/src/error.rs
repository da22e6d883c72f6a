//! Error taxonomy for the embedding object store and working-tree machinery.
//!
//! One variant per kind from the spec's error taxonomy, each carrying enough
//! context to print a useful message without a backtrace.

use std::path::PathBuf;
use thiserror::Error;

use crate::hash::ObjectHash;

/// Errors surfaced by `embr-core`.
#[derive(Debug, Error)]
pub enum EmbrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not a repository (or any parent): {path}")]
    NotInitialized { path: PathBuf },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("filesystem error at {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("hash mismatch for object {hash}: expected {expected}, computed {computed}")]
    HashMismatch {
        hash: ObjectHash,
        expected: ObjectHash,
        computed: ObjectHash,
    },

    #[error("partial hash '{partial}' is ambiguous ({count} matches)")]
    HashAmbiguous { partial: String, count: usize },

    #[error("compression error: {0}")]
    Compression(String),

    #[error("failed to acquire gc lock at {path}: {reason}")]
    LockFailed { path: PathBuf, reason: String },

    #[error("object {hash} is still referenced by set '{set}'")]
    Referenced { hash: ObjectHash, set: String },

    #[error("path too long: {0}")]
    PathTooLong(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation not implemented: {0}")]
    Unimplemented(String),
}

impl EmbrError {
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EmbrError>;
