//! Set manager: named working views analogous to Git branches.
//!
//! Global `.embr/HEAD` selects the current set. Each set is a directory
//! `.embr/sets/<name>/` holding its own `config` and `refs/<source>`
//! pointer files. The `.embr/index`, `.embr/log`, and `.embr/refs/models/`
//! files are repository-global (mirroring how Git's index tracks whatever
//! branch is checked out, rather than one index per branch).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EmbrError;
use crate::hash::ObjectHash;

pub const DEFAULT_SET: &str = "main";

fn is_valid_set_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn sets_dir(root: &Path) -> PathBuf {
    root.join(".embr").join("sets")
}

fn set_dir(root: &Path, name: &str) -> PathBuf {
    sets_dir(root).join(name)
}

fn set_config_path(root: &Path, name: &str) -> PathBuf {
    set_dir(root, name).join("config")
}

fn set_refs_dir(root: &Path, name: &str) -> PathBuf {
    set_dir(root, name).join("refs")
}

fn head_path(root: &Path) -> PathBuf {
    root.join(".embr").join("HEAD")
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Strategy applied when a merge hits conflicting hashes for the same source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Union,
    Mean,
    Max,
    Weighted,
}

#[derive(Debug, Clone)]
pub struct SetInfo {
    pub name: String,
    pub is_current: bool,
    pub created: Option<u64>,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub copied: usize,
    pub kept: usize,
}

pub struct SetManager<'a> {
    root: &'a Path,
}

impl<'a> SetManager<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    pub fn create(
        &self,
        name: &str,
        description: Option<&str>,
        base: Option<&str>,
    ) -> Result<(), EmbrError> {
        if !is_valid_set_name(name) {
            return Err(EmbrError::InvalidInput(format!(
                "set name '{name}' must match [A-Za-z0-9._-]+"
            )));
        }
        let dir = set_dir(self.root, name);
        if dir.exists() {
            return Err(EmbrError::AlreadyExists(format!("set '{name}' already exists")));
        }
        fs::create_dir_all(set_refs_dir(self.root, name))
            .map_err(|e| EmbrError::file_io(&dir, e))?;

        let mut config = format!("name={name}\ncreated={}\n", now_epoch());
        if let Some(desc) = description {
            config.push_str(&format!("description={desc}\n"));
        }
        if let Some(base) = base {
            config.push_str(&format!("base={base}\n"));
        }
        let config_path = set_config_path(self.root, name);
        fs::write(&config_path, config).map_err(|e| EmbrError::file_io(&config_path, e))?;

        if !head_path(self.root).exists() {
            self.write_head(name)?;
        }

        tracing::debug!(set = name, "created set");
        Ok(())
    }

    pub fn list(&self, verbose: bool) -> Result<Vec<SetInfo>, EmbrError> {
        let dir = sets_dir(self.root);
        let current = self.current().ok();
        let mut out = Vec::new();
        if !dir.exists() {
            return Ok(out);
        }
        let mut entries: Vec<_> = fs::read_dir(&dir)
            .map_err(|e| EmbrError::file_io(&dir, e))?
            .flatten()
            .filter(|e| e.path().is_dir())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let (created, description) = if verbose {
                self.read_config(&name).unwrap_or((None, None))
            } else {
                (None, None)
            };
            out.push(SetInfo {
                is_current: current.as_deref() == Some(name.as_str()),
                created,
                description,
                name,
            });
        }
        Ok(out)
    }

    fn read_config(&self, name: &str) -> Result<(Option<u64>, Option<String>), EmbrError> {
        let path = set_config_path(self.root, name);
        let text = fs::read_to_string(&path).map_err(|e| EmbrError::file_io(&path, e))?;
        let mut created = None;
        let mut description = None;
        for line in text.lines() {
            if let Some(v) = line.strip_prefix("created=") {
                created = v.parse().ok();
            } else if let Some(v) = line.strip_prefix("description=") {
                description = Some(v.to_string());
            }
        }
        Ok((created, description))
    }

    pub fn switch(&self, name: &str) -> Result<(), EmbrError> {
        if !set_dir(self.root, name).is_dir() {
            return Err(EmbrError::NotFound(format!("set '{name}' does not exist")));
        }
        self.write_head(name)
    }

    fn write_head(&self, name: &str) -> Result<(), EmbrError> {
        let path = head_path(self.root);
        let parent = path.parent().unwrap();
        let temp = parent.join(format!(".HEAD.tmp.{}", std::process::id()));
        fs::write(&temp, name).map_err(|e| EmbrError::file_io(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| EmbrError::file_io(&path, e))
    }

    pub fn delete(&self, name: &str, force: bool) -> Result<(), EmbrError> {
        let current = self.current()?;
        if current == name {
            return Err(EmbrError::InvalidInput(format!(
                "cannot delete the current set '{name}'"
            )));
        }
        if !force {
            tracing::warn!(
                set = name,
                "deleting set without unique-embedding detection; objects may become unreferenced"
            );
        }
        let dir = set_dir(self.root, name);
        let _ = fs::remove_file(set_config_path(self.root, name));
        let _ = fs::remove_dir_all(set_refs_dir(self.root, name));
        if let Err(e) = fs::remove_dir_all(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(set = name, error = %e, "could not fully remove set directory");
            }
        }
        Ok(())
    }

    /// Return the current set name, self-healing to `main` if HEAD is
    /// missing or dangling.
    pub fn current(&self) -> Result<String, EmbrError> {
        let path = head_path(self.root);
        let name = match fs::read_to_string(&path) {
            Ok(contents) => contents.trim().to_string(),
            Err(_) => {
                self.create(DEFAULT_SET, None, None).or_else(|e| match e {
                    EmbrError::AlreadyExists(_) => Ok(()),
                    other => Err(other),
                })?;
                self.write_head(DEFAULT_SET)?;
                return Ok(DEFAULT_SET.to_string());
            }
        };

        if name.is_empty() || !set_dir(self.root, &name).is_dir() {
            tracing::warn!(head = %name, "HEAD names a non-existent set, healing to 'main'");
            self.create(DEFAULT_SET, None, None).or_else(|e| match e {
                EmbrError::AlreadyExists(_) => Ok(()),
                other => Err(other),
            })?;
            self.write_head(DEFAULT_SET)?;
            return Ok(DEFAULT_SET.to_string());
        }

        Ok(name)
    }

    /// Merge all source-path references from `source` into `target`
    /// (defaulting to the current set).
    pub fn merge(
        &self,
        source: &str,
        target: Option<&str>,
        strategy: MergeStrategy,
    ) -> Result<MergeReport, EmbrError> {
        let target_name = match target {
            Some(t) => t.to_string(),
            None => self.current()?,
        };

        let source_refs_dir = set_refs_dir(self.root, source);
        if !source_refs_dir.is_dir() {
            return Err(EmbrError::NotFound(format!("set '{source}' does not exist")));
        }
        let target_refs_dir = set_refs_dir(self.root, &target_name);
        if !target_refs_dir.is_dir() {
            return Err(EmbrError::NotFound(format!(
                "set '{target_name}' does not exist"
            )));
        }

        let mut report = MergeReport::default();
        let entries = fs::read_dir(&source_refs_dir).map_err(|e| EmbrError::file_io(&source_refs_dir, e))?;
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            let source_ref_name = entry.file_name();
            let source_hash = fs::read_to_string(entry.path())
                .map_err(|e| EmbrError::file_io(&entry.path(), e))?
                .trim()
                .to_string();

            let target_ref_path = target_refs_dir.join(&source_ref_name);
            if !target_ref_path.exists() {
                fs::copy(entry.path(), &target_ref_path)
                    .map_err(|e| EmbrError::file_io(&target_ref_path, e))?;
                report.copied += 1;
                continue;
            }

            let target_hash = fs::read_to_string(&target_ref_path)
                .map_err(|e| EmbrError::file_io(&target_ref_path, e))?
                .trim()
                .to_string();

            if target_hash == source_hash {
                report.kept += 1;
                continue;
            }

            match strategy {
                MergeStrategy::Union => {
                    report.kept += 1;
                }
                MergeStrategy::Mean | MergeStrategy::Max => Err(EmbrError::Unimplemented(format!(
                    "merge strategy {strategy:?} is declared but not implemented by this core"
                )))?,
                MergeStrategy::Weighted => Err(EmbrError::Unimplemented(
                    "merge strategy Weighted requires a metadata weight key that is not specified"
                        .to_string(),
                ))?,
            }
        }

        Ok(report)
    }

    pub fn ref_path(&self, set: &str, source: &str) -> PathBuf {
        set_refs_dir(self.root, set).join(sanitize_ref_name(source))
    }

    pub fn write_ref(&self, set: &str, source: &str, hash: &ObjectHash) -> Result<(), EmbrError> {
        let path = self.ref_path(set, source);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EmbrError::file_io(parent, e))?;
        }
        fs::write(&path, format!("{hash}\n")).map_err(|e| EmbrError::file_io(&path, e))
    }
}

/// Ref filenames encode the source path; slashes are flattened so a single
/// ref file never spans directories.
pub fn sanitize_ref_name(source: &str) -> String {
    source.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo;
    use tempfile::tempdir;

    #[test]
    fn create_switch_current_roundtrip() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let mgr = SetManager::new(dir.path());
        mgr.create("experiment", Some("desc"), None).unwrap();
        mgr.switch("experiment").unwrap();
        assert_eq!(mgr.current().unwrap(), "experiment");
    }

    #[test]
    fn cannot_delete_current_set() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let mgr = SetManager::new(dir.path());
        let err = mgr.delete(DEFAULT_SET, true).unwrap_err();
        assert!(matches!(err, EmbrError::InvalidInput(_)));
    }

    #[test]
    fn dangling_head_heals_to_main() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        fs::write(dir.path().join(".embr/HEAD"), "nonexistent").unwrap();
        let mgr = SetManager::new(dir.path());
        assert_eq!(mgr.current().unwrap(), DEFAULT_SET);
    }

    #[test]
    fn merge_union_keeps_target_hash_on_conflict() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let mgr = SetManager::new(dir.path());
        mgr.create("feature", None, None).unwrap();

        let h1: ObjectHash = "a".repeat(64).parse().unwrap();
        let h2: ObjectHash = "b".repeat(64).parse().unwrap();
        mgr.write_ref(DEFAULT_SET, "doc.txt", &h1).unwrap();
        mgr.write_ref("feature", "doc.txt", &h2).unwrap();

        let report = mgr
            .merge("feature", Some(DEFAULT_SET), MergeStrategy::Union)
            .unwrap();
        assert_eq!(report.kept, 1);
        let kept = fs::read_to_string(mgr.ref_path(DEFAULT_SET, "doc.txt")).unwrap();
        assert_eq!(kept.trim(), h1.to_hex());
    }

    #[test]
    fn merge_weighted_is_unimplemented() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let mgr = SetManager::new(dir.path());
        mgr.create("feature", None, None).unwrap();
        let h1: ObjectHash = "a".repeat(64).parse().unwrap();
        let h2: ObjectHash = "b".repeat(64).parse().unwrap();
        mgr.write_ref(DEFAULT_SET, "doc.txt", &h1).unwrap();
        mgr.write_ref("feature", "doc.txt", &h2).unwrap();

        let err = mgr
            .merge("feature", Some(DEFAULT_SET), MergeStrategy::Weighted)
            .unwrap_err();
        assert!(matches!(err, EmbrError::Unimplemented(_)));
    }
}
