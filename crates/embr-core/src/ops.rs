//! The `store` data-flow: object write + sidecar + set ref + global
//! index/log/model-ref update, per `spec.md` §2's store path.

use std::path::Path;

use crate::error::EmbrError;
use crate::hash::ObjectHash;
use crate::header::{ObjectFlags, ObjectType};
use crate::sets::SetManager;
use crate::sidecar::Sidecar;
use crate::store;
use crate::workingtree;

#[derive(Debug, Clone)]
pub struct StoreRequest<'a> {
    pub source: &'a str,
    pub model: &'a str,
    pub file_type: &'a str,
    pub dimensions: Option<u32>,
    pub normalize: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct StoreReport {
    pub hash: ObjectHash,
    pub created: bool,
}

/// Store a raw embedding payload against the current set.
///
/// Mirrors `spec.md` §2's data flow: hash -> write object -> write sidecar
/// -> update the current set's ref, the global log, index, and the
/// per-model ref.
pub fn store(root: &Path, payload: &[u8], req: &StoreRequest<'_>) -> Result<StoreReport, EmbrError> {
    let mut flags = ObjectFlags::empty();
    if req.normalize {
        flags.insert(ObjectFlags::NORMALIZE);
    }
    let existed = {
        let hash = crate::hash::hash_payload(payload);
        store::object_exists(root, &hash)
    };

    let hash = store::write_object(root, payload, ObjectType::Vector, flags)?;

    let mut sidecar = Sidecar::new();
    sidecar.set("source_file", req.source);
    sidecar.set("timestamp", workingtree::now_epoch().to_string());
    sidecar.set("file_type", req.file_type);
    sidecar.set("provider", req.model);
    if let Some(dims) = req.dimensions {
        sidecar.set("dimensions", dims.to_string());
    }
    store::write_sidecar(root, &hash, &sidecar)?;

    let set_mgr = SetManager::new(root);
    let current = set_mgr.current()?;
    set_mgr.write_ref(&current, req.source, &hash)?;

    workingtree::append_log(root, &hash, req.source, req.model)?;
    workingtree::rewrite_index(root, &hash, req.source)?;
    workingtree::write_model_ref(root, req.model, &hash, req.source)?;

    tracing::info!(hash = %hash, source = req.source, model = req.model, "stored embedding");

    Ok(StoreReport {
        hash,
        created: !existed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo;
    use tempfile::tempdir;

    #[test]
    fn store_updates_index_log_and_current_ref() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let payload = b"\x03\x00\x00\x00\x00\x00\x80\x3f\x00\x00\x00\x40\x00\x00\x40\x40";
        let req = StoreRequest {
            source: "doc.txt",
            model: "openai",
            file_type: "bin",
            dimensions: Some(3),
            normalize: false,
        };
        let report = store(dir.path(), payload, &req).unwrap();
        assert!(report.created);

        let current = crate::resolve::current_hash(dir.path(), "doc.txt").unwrap();
        assert_eq!(current, report.hash);

        let history = crate::resolve::version_history(dir.path(), "doc.txt").unwrap();
        assert_eq!(history.len(), 1);

        let set_mgr = SetManager::new(dir.path());
        let ref_contents = std::fs::read_to_string(set_mgr.ref_path("main", "doc.txt")).unwrap();
        assert_eq!(ref_contents.trim(), report.hash.to_hex());
    }

    #[test]
    fn storing_twice_is_idempotent_for_the_object() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let payload = b"same bytes";
        let req = StoreRequest {
            source: "doc.txt",
            model: "openai",
            file_type: "bin",
            dimensions: None,
            normalize: false,
        };
        let first = store(dir.path(), payload, &req).unwrap();
        let second = store(dir.path(), payload, &req).unwrap();
        assert_eq!(first.hash, second.hash);
        assert!(first.created);
        assert!(!second.created);
    }
}
