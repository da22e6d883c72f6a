//! Reference resolution: current hash lookup and version history.

use std::path::Path;

use crate::error::EmbrError;
use crate::hash::ObjectHash;
use crate::store;
use crate::workingtree::{read_index, read_log, read_model_ref};

/// Last index entry for `source`, regardless of model.
pub fn current_hash(root: &Path, source: &str) -> Result<ObjectHash, EmbrError> {
    let entries = read_index(root)?;
    entries
        .iter()
        .rev()
        .find(|e| e.source == source)
        .map(|e| e.hash)
        .ok_or_else(|| EmbrError::NotFound(format!("no current hash for '{source}'")))
}

/// Resolve the current hash for `(source, model)`, preferring
/// `refs/models/<model>`, then the index (cross-checked against the
/// object's sidecar provider/model), then the log.
pub fn current_hash_with_model(
    root: &Path,
    source: &str,
    model: &str,
) -> Result<ObjectHash, EmbrError> {
    if let Some(entry) = read_model_ref(root, model)?
        .into_iter()
        .rev()
        .find(|e| e.source == source)
    {
        return Ok(entry.hash);
    }

    if let Some(entry) = read_index(root)?.into_iter().rev().find(|e| e.source == source) {
        if let Ok(sidecar) = store::read_sidecar(root, &entry.hash) {
            if sidecar.provider() == Some(model) {
                return Ok(entry.hash);
            }
        }
    }

    if let Some(entry) = read_log(root)?
        .into_iter()
        .rev()
        .find(|e| e.source == source && e.model == model)
    {
        return Ok(entry.hash);
    }

    Err(EmbrError::NotFound(format!(
        "no hash for '{source}' with model '{model}'"
    )))
}

#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub id: u64,
    pub timestamp: i64,
    pub hash: ObjectHash,
    pub provider: Option<String>,
}

/// Chronological version history for `source`, sequentially numbered.
pub fn version_history(root: &Path, source: &str) -> Result<Vec<VersionEntry>, EmbrError> {
    let entries = read_log(root)?;
    let mut out = Vec::new();
    let mut id = 0u64;
    for entry in entries.into_iter().filter(|e| e.source == source) {
        id += 1;
        let provider = store::read_sidecar(root, &entry.hash)
            .ok()
            .and_then(|s| s.provider().map(String::from))
            .or_else(|| Some(entry.model.clone()));
        out.push(VersionEntry {
            id,
            timestamp: entry.timestamp,
            hash: entry.hash,
            provider,
        });
    }
    Ok(out)
}
