//! Push/pull/prune sync orchestration, riding on top of a `Transport`.
//!
//! `index`/`log`/`refs/models` are repository-global rather than per-set
//! (see `SPEC_FULL.md` §3), so the snapshot pushed for a set reflects the
//! whole repository's working-tree state, not just that set's refs.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, Write as _};
use std::path::Path;

use embr_core::hash::ObjectHash;
use embr_core::header::{ObjectFlags, ObjectType};
use embr_core::{store, workingtree};
use embr_parquet::{transform, TransformOptions, TransformOutput};

use crate::error::TransportError;
use crate::metadata::{IndexEntryJson, MetadataSnapshot, ObjectEntryJson};
use crate::transport::Transport;

const RECEIVE_CAP_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct PushReport {
    pub pushed: u64,
    pub failed: Vec<(ObjectHash, String)>,
}

#[derive(Debug, Default)]
pub struct PullReport {
    pub pulled: u64,
    pub failed: Vec<(String, String)>,
    pub pruned: u64,
}

fn documents_prefix(set: &str) -> String {
    format!("sets/{set}/documents/")
}

fn metadata_key(set: &str) -> String {
    format!("sets/{set}/metadata.json")
}

fn document_key(set: &str, hash: &ObjectHash) -> String {
    format!("sets/{set}/documents/{hash}.parquet")
}

/// Push every logged embedding plus a `metadata.json` snapshot to `remote`.
///
/// Best-effort per object: a failure on one object does not abort the push.
pub async fn push(
    root: &Path,
    transport: &mut dyn Transport,
    set: &str,
    force: bool,
) -> Result<PushReport, TransportError> {
    let entries = workingtree::read_log(root)?;

    if force {
        let remote_keys = transport.list_files(&documents_prefix(set)).await?;
        let local_hashes: HashSet<String> = entries.iter().map(|e| e.hash.to_hex()).collect();
        let mut stale = Vec::new();
        for key in &remote_keys {
            if let Some(stem) = key.rsplit('/').next().and_then(|f| f.strip_suffix(".parquet")) {
                if !local_hashes.contains(stem) {
                    stale.push(key.clone());
                }
            }
        }
        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "force push removing stale remote objects");
            transport.delete_files(&documents_prefix(set), &stale).await?;
        }
    }

    let mut report = PushReport::default();
    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.hash) {
            continue;
        }
        match push_one(root, transport, set, &entry.hash).await {
            Ok(()) => report.pushed += 1,
            Err(e) => {
                tracing::warn!(hash = %entry.hash, error = %e, "failed to push object");
                report.failed.push((entry.hash, e.to_string()));
            }
        }
    }

    let snapshot = build_snapshot(root, &entries)?;
    let json = serde_json::to_vec_pretty(&snapshot)?;
    transport.send_data(&json, &metadata_key(set)).await?;

    Ok(report)
}

async fn push_one(
    root: &Path,
    transport: &mut dyn Transport,
    set: &str,
    hash: &ObjectHash,
) -> Result<(), TransportError> {
    let (payload, _header) = store::read_object(root, hash)?;
    let sidecar = store::read_sidecar(root, hash).ok();
    let output = transform(&payload, sidecar.as_ref(), &TransformOptions::default())?;
    match output {
        TransformOutput::Row(row) => {
            transport.send_data(&row.parquet_bytes, &document_key(set, hash)).await
        }
        TransformOutput::PassThrough(_) => {
            tracing::warn!(hash = %hash, "logged object is not a vector payload, skipping push");
            Ok(())
        }
    }
}

fn build_snapshot(
    root: &Path,
    log_entries: &[workingtree::LogEntry],
) -> Result<MetadataSnapshot, TransportError> {
    let index = workingtree::read_index(root)?
        .into_iter()
        .map(|e| IndexEntryJson {
            hash: e.hash.to_hex(),
            path: e.source,
        })
        .collect();

    let objects = log_entries
        .iter()
        .map(|e| ObjectEntryJson {
            created: e.timestamp,
            hash: e.hash.to_hex(),
            path: e.source.clone(),
            model: Some(e.model.clone()),
        })
        .collect();

    let mut refs = std::collections::BTreeMap::new();
    let models_dir = workingtree::refs_models_dir(root);
    if models_dir.is_dir() {
        for entry in fs::read_dir(&models_dir)?.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            let model = entry.file_name().to_string_lossy().into_owned();
            if let Some(last) = workingtree::read_model_ref(root, &model)?.last() {
                refs.insert(model, last.hash.to_hex());
            }
        }
    }

    Ok(MetadataSnapshot { index, objects, refs })
}

/// Pull new embeddings from `remote`, reconstructing local working-tree
/// state from `metadata.json` when it is absent.
pub async fn pull(
    root: &Path,
    transport: &mut dyn Transport,
    set: &str,
    prune: bool,
) -> Result<PullReport, TransportError> {
    ensure_working_tree_files(root)?;

    let remote_files = transport.list_files(&documents_prefix(set)).await?;
    let remote_hashes: HashSet<String> = remote_files
        .iter()
        .filter_map(|k| k.rsplit('/').next())
        .filter_map(|f| f.strip_suffix(".parquet"))
        .map(String::from)
        .collect();

    if working_tree_is_empty(root)? {
        if let Ok(bytes) = transport.receive_data(&metadata_key(set), RECEIVE_CAP_BYTES).await {
            if let Ok(snapshot) = serde_json::from_slice::<MetadataSnapshot>(&bytes) {
                rebuild_working_tree(root, &snapshot)?;
            }
        }
    }

    let local_hashes = local_object_hashes(root)?;

    let mut report = PullReport::default();
    for hash_hex in &remote_hashes {
        if local_hashes.contains(hash_hex) {
            continue;
        }
        match pull_one(root, transport, set, hash_hex).await {
            Ok(()) => report.pulled += 1,
            Err(e) => {
                tracing::warn!(hash = %hash_hex, error = %e, "failed to pull object");
                report.failed.push((hash_hex.clone(), e.to_string()));
            }
        }
    }

    if prune {
        report.pruned = prune_local(root, &local_hashes, &remote_hashes)?;
    }

    Ok(report)
}

async fn pull_one(
    root: &Path,
    transport: &mut dyn Transport,
    set: &str,
    hash_hex: &str,
) -> Result<(), TransportError> {
    let key = format!("sets/{set}/documents/{hash_hex}.parquet");
    let parquet_bytes = transport.receive_data(&key, RECEIVE_CAP_BYTES).await?;
    let (npy_bytes, sidecar) = embr_parquet::inverse_transform(&parquet_bytes)?;
    let hash = store::write_object(root, &npy_bytes, ObjectType::Vector, ObjectFlags::empty())?;
    if hash.to_hex() != hash_hex {
        tracing::warn!(
            expected = hash_hex,
            computed = %hash,
            "pulled object's recomputed hash does not match its remote key"
        );
    }
    store::write_sidecar(root, &hash, &sidecar)?;
    Ok(())
}

fn ensure_working_tree_files(root: &Path) -> Result<(), TransportError> {
    let index = workingtree::index_path(root);
    if !index.exists() {
        fs::write(&index, "")?;
    }
    let log = workingtree::log_path(root);
    if !log.exists() {
        fs::write(&log, "")?;
    }
    let models_dir = workingtree::refs_models_dir(root);
    fs::create_dir_all(&models_dir)?;
    Ok(())
}

/// True if `index`, `log`, or `refs/models/` is missing or empty —
/// `spec.md` §4.6's three-way trigger for rebuilding from a pulled
/// `metadata.json` snapshot.
fn working_tree_is_empty(root: &Path) -> Result<bool, TransportError> {
    let index_empty = workingtree::read_index(root)?.is_empty();
    let log_empty = workingtree::read_log(root)?.is_empty();
    Ok(index_empty || log_empty || refs_models_dir_is_empty(root)?)
}

fn refs_models_dir_is_empty(root: &Path) -> Result<bool, TransportError> {
    let dir = workingtree::refs_models_dir(root);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Ok(true);
    };
    for entry in entries.flatten() {
        if entry.path().is_file() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.len() > 0 {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn rebuild_working_tree(root: &Path, snapshot: &MetadataSnapshot) -> Result<(), TransportError> {
    for entry in &snapshot.index {
        if let Ok(hash) = entry.hash.parse::<ObjectHash>() {
            workingtree::rewrite_index(root, &hash, &entry.path)?;
        }
    }
    for entry in &snapshot.objects {
        if let Ok(hash) = entry.hash.parse::<ObjectHash>() {
            workingtree::append_log(
                root,
                &hash,
                &entry.path,
                entry.model.as_deref().unwrap_or("unknown"),
            )?;
        }
    }
    for (model, hash_hex) in &snapshot.refs {
        if let Ok(hash) = hash_hex.parse::<ObjectHash>() {
            if let Some(entry) = snapshot.index.iter().find(|e| &e.hash == hash_hex) {
                workingtree::write_model_ref(root, model, &hash, &entry.path)?;
            }
        }
    }
    tracing::info!("reconstructed local index/log/refs from remote metadata.json");
    Ok(())
}

fn local_object_hashes(root: &Path) -> Result<HashSet<String>, TransportError> {
    let objects_dir = root.join(".embr").join("objects");
    let mut out = HashSet::new();
    if !objects_dir.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(&objects_dir)?.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".raw").or_else(|| name.strip_suffix(".meta")) {
            out.insert(stem.to_string());
        }
    }
    Ok(out)
}

/// Remove local objects absent from the remote, after printing the diff and
/// requiring an interactive `y`/`Y` confirmation on stdin.
fn prune_local(
    root: &Path,
    local_hashes: &HashSet<String>,
    remote_hashes: &HashSet<String>,
) -> Result<u64, TransportError> {
    let to_remove: Vec<&String> = local_hashes.difference(remote_hashes).collect();
    if to_remove.is_empty() {
        return Ok(0);
    }

    println!("The following {} local object(s) are absent from the remote:", to_remove.len());
    for hash in &to_remove {
        println!("  {hash}");
    }
    print!("Remove them locally? [y/N] ");
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if !matches!(answer.trim(), "y" | "Y") {
        return Ok(0);
    }

    let mut removed = 0;
    for hash_hex in to_remove {
        if let Ok(hash) = hash_hex.parse::<ObjectHash>() {
            let _ = fs::remove_file(store::raw_object_path(root, &hash));
            let _ = fs::remove_file(store::meta_object_path(root, &hash));
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embr_core::header::{ObjectFlags as F, ObjectType as T};
    use tempfile::tempdir;

    #[test]
    fn build_snapshot_carries_index_and_objects() {
        let dir = tempdir().unwrap();
        let payload = b"abc";
        let hash = store::write_object(dir.path(), payload, T::Vector, F::empty()).unwrap();
        workingtree::rewrite_index(dir.path(), &hash, "doc.txt").unwrap();
        workingtree::append_log(dir.path(), &hash, "doc.txt", "openai").unwrap();

        let entries = workingtree::read_log(dir.path()).unwrap();
        let snapshot = build_snapshot(dir.path(), &entries).unwrap();
        assert_eq!(snapshot.index.len(), 1);
        assert_eq!(snapshot.objects.len(), 1);
        assert_eq!(snapshot.objects[0].hash, hash.to_hex());
    }

    #[test]
    fn rebuild_working_tree_recreates_index_and_log() {
        let dir = tempdir().unwrap();
        let hash = embr_core::hash::hash_payload(b"xyz");
        let snapshot = MetadataSnapshot {
            index: vec![IndexEntryJson {
                hash: hash.to_hex(),
                path: "doc.txt".to_string(),
            }],
            objects: vec![ObjectEntryJson {
                created: 1000,
                hash: hash.to_hex(),
                path: "doc.txt".to_string(),
                model: Some("openai".to_string()),
            }],
            refs: Default::default(),
        };
        rebuild_working_tree(dir.path(), &snapshot).unwrap();
        let index = workingtree::read_index(dir.path()).unwrap();
        assert_eq!(index.len(), 1);
        let log = workingtree::read_log(dir.path()).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn working_tree_is_empty_when_refs_models_dir_is_empty_even_with_index_and_log() {
        let dir = tempdir().unwrap();
        let hash = store::write_object(dir.path(), b"abc", T::Vector, F::empty()).unwrap();
        workingtree::rewrite_index(dir.path(), &hash, "doc.txt").unwrap();
        workingtree::append_log(dir.path(), &hash, "doc.txt", "openai").unwrap();
        fs::create_dir_all(workingtree::refs_models_dir(dir.path())).unwrap();

        assert!(working_tree_is_empty(dir.path()).unwrap());

        workingtree::write_model_ref(dir.path(), "openai", &hash, "doc.txt").unwrap();
        assert!(!working_tree_is_empty(dir.path()).unwrap());
    }
}
