//! `remote add|remove|list` — persisted to `.embr/remotes`, one
//! `<name>\t<url>` line per remote (see `SPEC_FULL.md` §6: `spec.md`'s
//! on-disk layout table does not name a storage location for this surface).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

fn remotes_path(root: &Path) -> PathBuf {
    root.join(".embr").join("remotes")
}

/// All configured remotes, keyed by name.
pub fn list(root: &Path) -> Result<BTreeMap<String, String>> {
    let path = remotes_path(root);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let mut out = BTreeMap::new();
    for line in text.lines() {
        if let Some((name, url)) = line.split_once('\t') {
            out.insert(name.to_string(), url.to_string());
        }
    }
    Ok(out)
}

pub fn add(root: &Path, name: &str, url: &str) -> Result<()> {
    let mut remotes = list(root)?;
    remotes.insert(name.to_string(), url.to_string());
    write(root, &remotes)
}

pub fn remove(root: &Path, name: &str) -> Result<()> {
    let mut remotes = list(root)?;
    if remotes.remove(name).is_none() {
        bail!("no remote named '{name}'");
    }
    write(root, &remotes)
}

/// Resolve a configured remote name to its URL.
pub fn resolve(root: &Path, name: &str) -> Result<String> {
    list(root)?
        .remove(name)
        .ok_or_else(|| anyhow::anyhow!("no remote named '{name}'"))
}

fn write(root: &Path, remotes: &BTreeMap<String, String>) -> Result<()> {
    let path = remotes_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut text = String::new();
    for (name, url) in remotes {
        text.push_str(&format!("{name}\t{url}\n"));
    }
    let temp = path.with_extension("tmp");
    fs::write(&temp, text)?;
    fs::rename(&temp, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_then_resolve_roundtrips() {
        let dir = tempdir().unwrap();
        add(dir.path(), "origin", "file:///tmp/store").unwrap();
        assert_eq!(resolve(dir.path(), "origin").unwrap(), "file:///tmp/store");
    }

    #[test]
    fn remove_unknown_remote_fails() {
        let dir = tempdir().unwrap();
        assert!(remove(dir.path(), "origin").is_err());
    }

    #[test]
    fn list_is_empty_when_no_remotes_file_exists() {
        let dir = tempdir().unwrap();
        assert!(list(dir.path()).unwrap().is_empty());
    }
}
