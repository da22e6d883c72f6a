//! Repository-global `index`, `log`, and `refs/models/<model>` files.
//!
//! These mirror how Git's index reflects whatever branch is checked out
//! rather than keeping one index per branch: every `store` updates the same
//! global files regardless of which set is current (see `SPEC_FULL.md` §3).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EmbrError;
use crate::hash::ObjectHash;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: i64,
    pub hash: ObjectHash,
    pub source: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub hash: ObjectHash,
    pub source: String,
}

pub fn index_path(root: &Path) -> PathBuf {
    root.join(".embr").join("index")
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join(".embr").join("log")
}

pub fn refs_models_dir(root: &Path) -> PathBuf {
    root.join(".embr").join("refs").join("models")
}

pub fn refs_models_path(root: &Path, model: &str) -> PathBuf {
    refs_models_dir(root).join(model)
}

pub fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Append one line to `.embr/log`. Never rewritten except by full
/// reconstruction (see `reconstruct_log`).
pub fn append_log(root: &Path, hash: &ObjectHash, source: &str, model: &str) -> Result<(), EmbrError> {
    let path = log_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EmbrError::file_io(parent, e))?;
    }
    let line = format!("{} {hash} {source} {model}\n", now_epoch());
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| EmbrError::file_io(&path, e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| EmbrError::file_io(&path, e))
}

pub fn read_log(root: &Path) -> Result<Vec<LogEntry>, EmbrError> {
    let path = log_path(root);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EmbrError::file_io(&path, e)),
    };
    let mut out = Vec::new();
    for line in text.lines() {
        let mut parts = line.splitn(4, ' ');
        let (Some(ts), Some(hash), Some(source), Some(model)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let (Ok(ts), Ok(hash)) = (ts.parse::<i64>(), hash.parse::<ObjectHash>()) else {
            continue;
        };
        out.push(LogEntry {
            timestamp: ts,
            hash,
            source: source.to_string(),
            model: model.to_string(),
        });
    }
    Ok(out)
}

/// Rewrite `.embr/index`, keeping at most one line per `source_path`
/// (the line produced by the most recent store), via temp-file-plus-rename.
pub fn rewrite_index(root: &Path, hash: &ObjectHash, source: &str) -> Result<(), EmbrError> {
    let path = index_path(root);
    let mut entries = read_index(root)?;
    entries.retain(|e| e.source != source);
    entries.push(IndexEntry {
        hash: *hash,
        source: source.to_string(),
    });

    let mut text = String::new();
    for entry in &entries {
        text.push_str(&format!("{} {}\n", entry.hash, entry.source));
    }

    let parent = path.parent().unwrap();
    fs::create_dir_all(parent).map_err(|e| EmbrError::file_io(parent, e))?;
    let temp = parent.join(format!(".index.tmp.{}", std::process::id()));
    fs::write(&temp, &text).map_err(|e| EmbrError::file_io(&temp, e))?;
    fs::rename(&temp, &path).map_err(|e| EmbrError::file_io(&path, e))
}

pub fn read_index(root: &Path) -> Result<Vec<IndexEntry>, EmbrError> {
    let path = index_path(root);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EmbrError::file_io(&path, e)),
    };
    let mut out = Vec::new();
    for line in text.lines() {
        let mut parts = line.splitn(2, ' ');
        let (Some(hash), Some(source)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(hash) = hash.parse::<ObjectHash>() else {
            continue;
        };
        out.push(IndexEntry {
            hash,
            source: source.to_string(),
        });
    }
    Ok(out)
}

/// Rewrite `refs/models/<model>` to replace any previous entry for `source`.
pub fn write_model_ref(root: &Path, model: &str, hash: &ObjectHash, source: &str) -> Result<(), EmbrError> {
    let dir = refs_models_dir(root);
    fs::create_dir_all(&dir).map_err(|e| EmbrError::file_io(&dir, e))?;
    let path = refs_models_path(root, model);

    let mut entries = read_model_ref(root, model)?;
    entries.retain(|e| e.source != source);
    entries.push(IndexEntry {
        hash: *hash,
        source: source.to_string(),
    });

    let mut text = String::new();
    for entry in &entries {
        text.push_str(&format!("{} {}\n", entry.hash, entry.source));
    }

    let temp = dir.join(format!(".{model}.tmp.{}", std::process::id()));
    fs::write(&temp, &text).map_err(|e| EmbrError::file_io(&temp, e))?;
    fs::rename(&temp, &path).map_err(|e| EmbrError::file_io(&path, e))
}

pub fn read_model_ref(root: &Path, model: &str) -> Result<Vec<IndexEntry>, EmbrError> {
    let path = refs_models_path(root, model);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EmbrError::file_io(&path, e)),
    };
    let mut out = Vec::new();
    for line in text.lines() {
        let mut parts = line.splitn(2, ' ');
        let (Some(hash), Some(source)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(hash) = hash.parse::<ObjectHash>() else {
            continue;
        };
        out.push(IndexEntry {
            hash,
            source: source.to_string(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn hash_of(byte: u8) -> ObjectHash {
        crate::hash::hash_payload(&[byte])
    }

    #[test]
    fn rewrite_index_deduplicates_by_source() {
        let dir = tempdir().unwrap();
        rewrite_index(dir.path(), &hash_of(1), "doc.txt").unwrap();
        rewrite_index(dir.path(), &hash_of(2), "doc.txt").unwrap();
        let entries = read_index(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash, hash_of(2));
    }

    #[test]
    fn log_is_append_only_and_chronological() {
        let dir = tempdir().unwrap();
        append_log(dir.path(), &hash_of(1), "doc.txt", "openai").unwrap();
        append_log(dir.path(), &hash_of(2), "doc.txt", "openai").unwrap();
        let entries = read_log(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].hash, hash_of(2));
    }

    #[test]
    fn model_ref_keeps_latest_per_source() {
        let dir = tempdir().unwrap();
        write_model_ref(dir.path(), "openai", &hash_of(1), "doc.txt").unwrap();
        write_model_ref(dir.path(), "openai", &hash_of(2), "doc.txt").unwrap();
        let entries = read_model_ref(dir.path(), "openai").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash, hash_of(2));
    }
}
