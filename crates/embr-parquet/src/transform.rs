//! Bidirectional transform between the internal object format and the
//! four-column Pinecone-compatible Parquet interchange schema.
//!
//! No global mutable state: document text threads through explicitly via
//! `TransformOptions` rather than the thread-local pointer the original
//! implementation used (see `SPEC_FULL.md` §9).

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float32Array, ListArray, RecordBatch, StringArray};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::Field;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::json;

use embr_core::header::{ObjectFlags, ObjectHeader, HEADER_LEN};
use embr_core::payload::{self, FileType};
use embr_core::{ObjectHash, Sidecar};

use crate::error::{ParquetTransformError, Result};
use crate::schema::embedding_schema;
use crate::writer::write_parquet;

/// Explicit per-call options, replacing the source's thread-local
/// document-text pointer.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub document_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransformedRow {
    pub parquet_bytes: Vec<u8>,
    pub id: String,
}

/// Result of `transform`: either a one-row Parquet encoding of a vector
/// object, or the original bytes unchanged when the input is already
/// JSON/text.
#[derive(Debug, Clone)]
pub enum TransformOutput {
    Row(TransformedRow),
    PassThrough(Vec<u8>),
}

/// Strip a leading object header (decompressing the body if flagged),
/// returning the raw payload. Inputs without a recognizable header are
/// passed through unchanged.
fn strip_object_header(source: &[u8]) -> Result<Vec<u8>> {
    if source.len() < HEADER_LEN {
        return Ok(source.to_vec());
    }
    let Ok(header) = ObjectHeader::from_bytes(&source[..HEADER_LEN]) else {
        return Ok(source.to_vec());
    };
    let body = &source[HEADER_LEN..];
    if header.flags.contains(ObjectFlags::COMPRESSED) {
        Ok(embr_core::codec::decompress(body)?)
    } else {
        Ok(body.to_vec())
    }
}

/// Convert an internal object (optionally header-framed) into the Parquet
/// interchange row, or pass through unchanged if it is plain JSON/text.
pub fn transform(
    source: &[u8],
    meta: Option<&Sidecar>,
    opts: &TransformOptions,
) -> Result<TransformOutput> {
    let payload_bytes = strip_object_header(source)?;

    let leading = payload_bytes.iter().find(|b| !b.is_ascii_whitespace());
    if matches!(leading, Some(b'{') | Some(b'[')) {
        tracing::debug!("transform: input is plain JSON/text, passing through unchanged");
        return Ok(TransformOutput::PassThrough(payload_bytes));
    }

    let parsed = payload::parse(&payload_bytes)?;
    let hash = embr_core::hash::hash_payload(&payload_bytes);
    let id = hash.to_hex();

    let metadata_json = build_metadata_json(&hash, parsed.values.len(), parsed.file_type, meta);
    let blob_json = match &opts.document_text {
        Some(text) => json!({ "text": text }).to_string(),
        None => "{}".to_string(),
    };

    let batch = build_record_batch(&id, &parsed.values, &metadata_json, &blob_json)?;
    let parquet_bytes = write_parquet(&batch)?;

    Ok(TransformOutput::Row(TransformedRow { parquet_bytes, id }))
}

fn build_metadata_json(
    hash: &ObjectHash,
    dimensions: usize,
    file_type: FileType,
    meta: Option<&Sidecar>,
) -> String {
    let mut map = serde_json::Map::new();
    map.insert("hash".to_string(), json!(hash.to_hex()));
    map.insert("dimensions".to_string(), json!(dimensions));
    map.insert("file_type".to_string(), json!(file_type.as_str()));
    if let Some(meta) = meta {
        if let Some(source) = meta.source_file() {
            map.insert("source".to_string(), json!(source));
        }
        if let Some(model) = meta.provider() {
            map.insert("model".to_string(), json!(model));
        }
        if let Some(ts) = meta.timestamp() {
            map.insert("timestamp".to_string(), json!(ts));
        }
    }
    serde_json::Value::Object(map).to_string()
}

fn build_record_batch(
    id: &str,
    values: &[f32],
    metadata_json: &str,
    blob_json: &str,
) -> Result<RecordBatch> {
    let id_array = StringArray::from(vec![id]);
    let values_array: ArrayRef = Arc::new(Float32Array::from(values.to_vec()));
    let offsets = OffsetBuffer::new(vec![0i32, values.len() as i32].into());
    let list_field = Arc::new(Field::new("item", arrow::datatypes::DataType::Float32, false));
    let values_list = ListArray::new(list_field, offsets, values_array, None);
    let metadata_array = StringArray::from(vec![metadata_json]);
    let blob_array = StringArray::from(vec![blob_json]);

    Ok(RecordBatch::try_new(
        embedding_schema(),
        vec![
            Arc::new(id_array),
            Arc::new(values_list),
            Arc::new(metadata_array),
            Arc::new(blob_array),
        ],
    )?)
}

/// Reverse `transform`: read a single-row Parquet file and reconstruct the
/// object's NumPy payload plus its sidecar.
pub fn inverse_transform(parquet_bytes: &[u8]) -> Result<(Vec<u8>, Sidecar)> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(parquet_bytes.to_vec()))?
        .build()?;

    let mut values: Vec<f32> = Vec::new();
    let mut metadata_json = String::new();

    for batch in reader {
        let batch = batch?;
        if batch.num_rows() == 0 {
            continue;
        }
        let values_col = batch
            .column_by_name("values")
            .ok_or_else(|| ParquetTransformError::InvalidFormat("missing 'values' column".into()))?
            .as_any()
            .downcast_ref::<ListArray>()
            .ok_or_else(|| ParquetTransformError::InvalidFormat("'values' is not a list column".into()))?;
        let row_values = values_col.value(0);
        let float_values = row_values
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| ParquetTransformError::InvalidFormat("'values' items are not float32".into()))?;
        values = float_values.values().to_vec();

        let metadata_col = batch
            .column_by_name("metadata")
            .ok_or_else(|| ParquetTransformError::InvalidFormat("missing 'metadata' column".into()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| ParquetTransformError::InvalidFormat("'metadata' is not a string column".into()))?;
        metadata_json = metadata_col.value(0).to_string();
        break;
    }

    let npy_bytes = payload::encode_npy(&values);
    let sidecar = sidecar_from_metadata_json(&metadata_json)?;

    Ok((npy_bytes, sidecar))
}

fn sidecar_from_metadata_json(json_text: &str) -> Result<Sidecar> {
    let value: serde_json::Value = serde_json::from_str(json_text)?;
    let mut sidecar = Sidecar::new();
    let Some(obj) = value.as_object() else {
        return Ok(sidecar);
    };
    for key in ["hash", "dimensions", "file_type", "source", "model", "timestamp"] {
        if let Some(v) = obj.get(key) {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let sidecar_key = match key {
                "source" => "source_file",
                "model" => "provider",
                other => other,
            };
            sidecar.set(sidecar_key, text);
        }
    }
    Ok(sidecar)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_then_inverse_transform_roundtrips_values() {
        let payload = embr_core::payload::encode_npy(&[0.5, -0.5]);
        let output = transform(&payload, None, &TransformOptions::default()).unwrap();
        let TransformOutput::Row(row) = output else {
            panic!("expected a transformed row");
        };
        let (npy_bytes, _sidecar) = inverse_transform(&row.parquet_bytes).unwrap();
        let parsed = payload::parse(&npy_bytes).unwrap();
        assert_eq!(parsed.values, vec![0.5, -0.5]);
    }

    #[test]
    fn transform_passes_through_plain_json() {
        let text = br#"{"hello": "world"}"#;
        let output = transform(text, None, &TransformOptions::default()).unwrap();
        match output {
            TransformOutput::PassThrough(bytes) => assert_eq!(bytes, text),
            TransformOutput::Row(_) => panic!("expected pass-through"),
        }
    }

    #[test]
    fn metadata_column_carries_dimensions_and_file_type() {
        let payload = payload::encode_npy(&[0.5, -0.5]);
        let output = transform(&payload, None, &TransformOptions::default()).unwrap();
        let TransformOutput::Row(row) = output else {
            panic!("expected a transformed row");
        };
        let (_npy, sidecar) = inverse_transform(&row.parquet_bytes).unwrap();
        assert_eq!(sidecar.dimensions(), Some("2"));
        assert_eq!(sidecar.file_type(), Some("npy"));
    }

    #[test]
    fn document_text_flows_through_options_not_global_state() {
        let payload = payload::encode_npy(&[1.0]);
        let opts = TransformOptions {
            document_text: Some("hello".to_string()),
        };
        let output = transform(&payload, None, &opts).unwrap();
        assert!(matches!(output, TransformOutput::Row(_)));
    }
}
