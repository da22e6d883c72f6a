//! Errors for the Parquet transformer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParquetTransformError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] embr_core::EmbrError),
}

pub type Result<T> = std::result::Result<T, ParquetTransformError>;
