//! Errors for the transport layer and sync orchestration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unsupported remote URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("transport not open: call open() before this operation")]
    NotOpen,

    #[error("opendal error: {0}")]
    Opendal(#[from] opendal::Error),

    #[error("core error: {0}")]
    Core(#[from] embr_core::EmbrError),

    #[error("parquet transform error: {0}")]
    Parquet(#[from] embr_parquet::ParquetTransformError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for embr_core::EmbrError {
    fn from(err: TransportError) -> Self {
        embr_core::EmbrError::InvalidInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
