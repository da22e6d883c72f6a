//! Content-addressed object store: `<hash>.raw` + `<hash>.meta` under
//! `.embr/objects/`, written once via temp-file-plus-rename.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::EmbrError;
use crate::hash::{hash_payload, ObjectHash};
use crate::header::{ObjectFlags, ObjectHeader, ObjectType, HEADER_LEN};
use crate::sidecar::Sidecar;

pub const OBJECTS_DIR: &str = "objects";
pub const TEMP_DIR: &str = "temp";

fn objects_dir(root: &Path) -> PathBuf {
    root.join(".embr").join(OBJECTS_DIR)
}

fn temp_dir(root: &Path) -> PathBuf {
    objects_dir(root).join(TEMP_DIR)
}

fn raw_path(root: &Path, hash: &ObjectHash) -> PathBuf {
    objects_dir(root).join(format!("{hash}.raw"))
}

fn meta_path(root: &Path, hash: &ObjectHash) -> PathBuf {
    objects_dir(root).join(format!("{hash}.meta"))
}

/// Ensure `.embr/objects/` and `.embr/objects/temp/` exist.
pub fn ensure_dirs(root: &Path) -> Result<(), EmbrError> {
    let temp = temp_dir(root);
    fs::create_dir_all(&temp).map_err(|e| EmbrError::file_io(&temp, e))
}

/// Write `payload` as a content-addressed object of `obj_type`, returning its
/// hash. Idempotent: if the object already exists on disk, returns success
/// without rewriting it.
pub fn write_object(
    root: &Path,
    payload: &[u8],
    obj_type: ObjectType,
    mut flags: ObjectFlags,
) -> Result<ObjectHash, EmbrError> {
    ensure_dirs(root)?;
    let hash = hash_payload(payload);
    let final_path = raw_path(root, &hash);

    if final_path.exists() {
        return Ok(hash);
    }

    let body = match obj_type {
        ObjectType::Vector => {
            flags.insert(ObjectFlags::COMPRESSED);
            codec::compress(payload, codec::DEFAULT_COMPRESSION_LEVEL)?
        }
        ObjectType::Meta => payload.to_vec(),
    };

    let header = ObjectHeader::new(obj_type, flags, payload.len() as u64, hash);

    let temp_path = temp_dir(root).join(format!("tmp-{hash}"));
    let write_result = (|| -> Result<(), EmbrError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| EmbrError::file_io(&temp_path, e))?;
        file.write_all(&header.to_bytes())
            .map_err(|e| EmbrError::file_io(&temp_path, e))?;
        file.write_all(&body)
            .map_err(|e| EmbrError::file_io(&temp_path, e))?;
        file.sync_all().map_err(|e| EmbrError::file_io(&temp_path, e))
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, &final_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        EmbrError::file_io(&final_path, e)
    })?;

    Ok(hash)
}

/// Read and validate an object, returning its decompressed payload and header.
pub fn read_object(root: &Path, hash: &ObjectHash) -> Result<(Vec<u8>, ObjectHeader), EmbrError> {
    let path = raw_path(root, hash);
    let contents = fs::read(&path).map_err(|e| EmbrError::file_io(&path, e))?;
    if contents.len() < HEADER_LEN {
        return Err(EmbrError::InvalidFormat(format!(
            "object {hash} is shorter than its header"
        )));
    }
    let header = ObjectHeader::from_bytes(&contents[..HEADER_LEN])?;
    let body = &contents[HEADER_LEN..];

    let payload = if header.flags.contains(ObjectFlags::COMPRESSED) {
        let decompressed = codec::decompress(body)?;
        if decompressed.len() as u64 != header.size {
            return Err(EmbrError::InvalidFormat(format!(
                "object {hash} declared size {} but decompressed to {} bytes",
                header.size,
                decompressed.len()
            )));
        }
        decompressed
    } else {
        body.to_vec()
    };

    if header.obj_type == ObjectType::Vector {
        let computed = hash_payload(&payload);
        if computed != header.hash || computed != *hash {
            return Err(EmbrError::HashMismatch {
                hash: *hash,
                expected: header.hash,
                computed,
            });
        }
    }

    Ok((payload, header))
}

/// Resolve a partial hash (>= 4 hex chars) to the single matching full hash.
pub fn resolve_hash(root: &Path, partial: &str) -> Result<ObjectHash, EmbrError> {
    if partial.len() < 4 {
        return Err(EmbrError::InvalidInput(
            "partial hash must be at least 4 characters".to_string(),
        ));
    }
    let partial_lower = partial.to_lowercase();

    let direct = objects_dir(root).join(format!("{partial_lower}.raw"));
    if partial_lower.len() == 64 && direct.exists() {
        return partial_lower.parse();
    }

    let dir = objects_dir(root);
    let mut matches = Vec::new();
    if let Ok(entries) = fs::read_dir(&dir) {
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".raw") {
                if stem.starts_with(&partial_lower) {
                    matches.push(stem.to_string());
                }
            }
        }
    }

    match matches.len() {
        0 => Err(EmbrError::NotFound(format!(
            "no object matches partial hash '{partial}'"
        ))),
        1 => matches[0].parse(),
        count => Err(EmbrError::HashAmbiguous {
            partial: partial.to_string(),
            count,
        }),
    }
}

pub fn write_sidecar(root: &Path, hash: &ObjectHash, sidecar: &Sidecar) -> Result<(), EmbrError> {
    ensure_dirs(root)?;
    sidecar.write(&meta_path(root, hash))
}

pub fn read_sidecar(root: &Path, hash: &ObjectHash) -> Result<Sidecar, EmbrError> {
    Sidecar::read(&meta_path(root, hash))
}

pub fn object_exists(root: &Path, hash: &ObjectHash) -> bool {
    raw_path(root, hash).exists()
}

pub fn raw_object_path(root: &Path, hash: &ObjectHash) -> PathBuf {
    raw_path(root, hash)
}

pub fn meta_object_path(root: &Path, hash: &ObjectHash) -> PathBuf {
    meta_path(root, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_vector_roundtrips() {
        let dir = tempdir().unwrap();
        let payload = b"\x03\x00\x00\x00\x00\x00\x80\x3f\x00\x00\x00\x40\x00\x00\x40\x40";
        let hash =
            write_object(dir.path(), payload, ObjectType::Vector, ObjectFlags::empty()).unwrap();
        let (read_payload, header) = read_object(dir.path(), &hash).unwrap();
        assert_eq!(read_payload, payload);
        assert_eq!(header.hash, hash);
        assert!(header.flags.contains(ObjectFlags::COMPRESSED));
    }

    #[test]
    fn write_is_idempotent() {
        let dir = tempdir().unwrap();
        let payload = b"same payload";
        let h1 = write_object(dir.path(), payload, ObjectType::Vector, ObjectFlags::empty())
            .unwrap();
        let h2 = write_object(dir.path(), payload, ObjectType::Vector, ObjectFlags::empty())
            .unwrap();
        assert_eq!(h1, h2);
        // only one file should exist
        let entries: Vec<_> = fs::read_dir(objects_dir(dir.path()))
            .unwrap()
            .flatten()
            .filter(|e| e.file_type().unwrap().is_file())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn resolve_rejects_short_partials() {
        let dir = tempdir().unwrap();
        assert!(resolve_hash(dir.path(), "ab").is_err());
    }

    #[test]
    fn resolve_detects_ambiguous_and_unique_matches() {
        let dir = tempdir().unwrap();
        ensure_dirs(dir.path()).unwrap();
        let objects = objects_dir(dir.path());
        fs::write(objects.join("abcd1234deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbee1.raw"), b"x").unwrap();
        fs::write(objects.join("abcdef00deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbee2.raw"), b"x").unwrap();

        let ambiguous = resolve_hash(dir.path(), "abcd");
        assert!(matches!(ambiguous, Err(EmbrError::HashAmbiguous { .. })));

        fs::remove_file(objects.join("abcdef00deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbee2.raw")).unwrap();
        let unique = resolve_hash(dir.path(), "abcd").unwrap();
        assert!(unique.to_hex().starts_with("abcd1234"));
    }

    #[test]
    fn tampered_payload_is_rejected_as_hash_mismatch() {
        let dir = tempdir().unwrap();
        let hash = write_object(dir.path(), b"payload", ObjectType::Vector, ObjectFlags::empty())
            .unwrap();
        let path = raw_object_path(dir.path(), &hash);
        let mut contents = fs::read(&path).unwrap();
        // Flip a byte inside the compressed body to corrupt the decompressed payload.
        let last = contents.len() - 1;
        contents[last] ^= 0xFF;
        fs::write(&path, contents).unwrap();

        // Corrupting a zstd frame usually breaks decompression itself; either
        // failure mode is acceptable as long as it is reported, not silently
        // accepted.
        let result = read_object(dir.path(), &hash);
        assert!(result.is_err());
    }
}
