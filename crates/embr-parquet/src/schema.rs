//! The fixed, four-column Pinecone-compatible interchange schema.

use std::sync::{Arc, OnceLock};

use arrow::datatypes::{DataType, Field, Schema};

/// Returns a cached `Arc<Schema>` for the embedding interchange format:
/// `id` (Utf8), `values` (List<Float32>), `metadata` (Utf8 JSON),
/// `blob` (Utf8 JSON).
pub fn embedding_schema() -> Arc<Schema> {
    static SCHEMA: OnceLock<Arc<Schema>> = OnceLock::new();
    Arc::clone(SCHEMA.get_or_init(build_schema))
}

fn build_schema() -> Arc<Schema> {
    let values_field = Field::new("item", DataType::Float32, false);
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "values",
            DataType::List(Arc::new(values_field)),
            false,
        ),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("blob", DataType::Utf8, false),
    ]))
}
