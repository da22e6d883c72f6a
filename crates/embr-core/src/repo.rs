//! Repository root discovery and `init`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EmbrError;
use crate::sets::DEFAULT_SET;

const DEFAULT_CONFIG_HEADER: &str = "# EmbeddingBridge config file\n";

/// Locate the repository root.
///
/// `EB_DIR` overrides discovery entirely when set. Otherwise walk upward
/// from `start` looking for a `.embr/` directory.
pub fn discover_root(start: &Path) -> Result<PathBuf, EmbrError> {
    if let Ok(dir) = env::var("EB_DIR") {
        let path = PathBuf::from(dir);
        if path.join(".embr").is_dir() {
            return Ok(path);
        }
        return Err(EmbrError::NotInitialized { path });
    }

    let mut current = start.to_path_buf();
    loop {
        if current.join(".embr").is_dir() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(EmbrError::NotInitialized {
                path: start.to_path_buf(),
            });
        }
    }
}

/// Initialize a new repository at `root`.
///
/// Idempotent unless `force` is false and `.embr/` already exists, in which
/// case `AlreadyExists` is returned.
pub fn init(root: &Path, force: bool) -> Result<(), EmbrError> {
    let embr_dir = root.join(".embr");
    if embr_dir.exists() && !force {
        return Err(EmbrError::AlreadyExists(format!(
            "repository already initialized at {}",
            embr_dir.display()
        )));
    }

    for sub in [
        "objects",
        "objects/temp",
        "metadata",
        "metadata/files",
        "metadata/models",
        "metadata/versions",
        "sets",
        "refs/models",
    ] {
        let path = embr_dir.join(sub);
        fs::create_dir_all(&path).map_err(|e| EmbrError::file_io(&path, e))?;
    }

    let config_path = embr_dir.join("config");
    if !config_path.exists() {
        fs::write(&config_path, DEFAULT_CONFIG_HEADER)
            .map_err(|e| EmbrError::file_io(&config_path, e))?;
    }

    let head_path = embr_dir.join("HEAD");
    if !head_path.exists() {
        fs::write(&head_path, DEFAULT_SET).map_err(|e| EmbrError::file_io(&head_path, e))?;
    }

    let log_path = embr_dir.join("log");
    if !log_path.exists() {
        fs::write(&log_path, "").map_err(|e| EmbrError::file_io(&log_path, e))?;
    }

    let index_path = embr_dir.join("index");
    if !index_path.exists() {
        fs::write(&index_path, "").map_err(|e| EmbrError::file_io(&index_path, e))?;
    }

    crate::sets::SetManager::new(root).create(DEFAULT_SET, None, None).or_else(|e| match e {
        EmbrError::AlreadyExists(_) => Ok(()),
        other => Err(other),
    })?;

    tracing::info!(root = %root.display(), "initialized embr repository");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_expected_layout() {
        let dir = tempdir().unwrap();
        init(dir.path(), false).unwrap();

        let embr = dir.path().join(".embr");
        for sub in [
            "objects",
            "objects/temp",
            "metadata",
            "metadata/files",
            "metadata/models",
            "metadata/versions",
        ] {
            assert!(embr.join(sub).is_dir(), "missing {sub}");
        }
        let config = fs::read_to_string(embr.join("config")).unwrap();
        assert!(config.starts_with("# EmbeddingBridge config file"));
        let head = fs::read_to_string(embr.join("HEAD")).unwrap();
        assert_eq!(head, "main");
        assert!(embr.join("sets/main/config").is_file());
    }

    #[test]
    fn init_without_force_twice_fails() {
        let dir = tempdir().unwrap();
        init(dir.path(), false).unwrap();
        let err = init(dir.path(), false).unwrap_err();
        assert!(matches!(err, EmbrError::AlreadyExists(_)));
    }

    #[test]
    fn discover_root_walks_upward() {
        let dir = tempdir().unwrap();
        init(dir.path(), false).unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        let found = discover_root(&nested).unwrap();
        assert_eq!(found, dir.path());
    }
}
