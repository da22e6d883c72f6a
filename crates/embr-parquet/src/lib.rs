//! embr-parquet — bidirectional transform between embr's internal object
//! format and a four-column Arrow/Parquet interchange format compatible
//! with common vector-database bulk import tooling.

pub mod error;
pub mod schema;
pub mod transform;
pub mod writer;

pub use error::{ParquetTransformError, Result};
pub use schema::embedding_schema;
pub use transform::{inverse_transform, transform, TransformOptions, TransformOutput, TransformedRow};
