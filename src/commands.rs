//! Library entry points behind the command surface `spec.md` §6 names:
//! `init`, `set`, `switch`, `store`, `log`, `status`, `diff`, `push`, `pull`,
//! `gc`, `merge`, `rollback`, `rm`, `get`, `model`, `hooks`, `config`.
//!
//! Argument parsing and help text are out of scope (`spec.md` §1); each
//! function here takes already-parsed arguments and returns `anyhow::Result`,
//! the same boundary `otlp2parquet-writer` draws between its typed
//! `WriterError` and the root crate's `anyhow::Error`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use embr_core::gc::{run_gc, GcResult, PruneExpire};
use embr_core::hash::ObjectHash;
use embr_core::ops::{self, StoreRequest};
use embr_core::payload;
use embr_core::resolve::{self, VersionEntry};
use embr_core::sets::{MergeReport, MergeStrategy, SetInfo, SetManager};
use embr_core::{repo, store, workingtree};
use embr_transport::{OpendalTransport, PullReport, PushReport, Transport};

use crate::remote;

/// `init [--force] [--no-git] [-m model]`.
///
/// `--no-git` and a default model are recorded nowhere by this core (the
/// former is about hook installation, out of scope per `spec.md` §1; the
/// latter has no persisted home until `hooks`/`config` writes one) — both
/// are accepted and logged so the command surface matches the spec.
pub fn init(root: &Path, force: bool, no_git: bool, model: Option<&str>) -> Result<()> {
    repo::init(root, force)?;
    if no_git {
        tracing::debug!("skipping git hook installation (--no-git)");
    }
    if let Some(model) = model {
        tracing::info!(model, "default model noted for this init");
    }
    Ok(())
}

/// `set [-v] [-d name] [-f] [name]`: create (when `name` is `Some` and no
/// existing set matches) or list sets.
pub fn set_create(root: &Path, name: &str, description: Option<&str>) -> Result<()> {
    SetManager::new(root).create(name, description, None)?;
    Ok(())
}

pub fn set_list(root: &Path, verbose: bool) -> Result<Vec<SetInfo>> {
    Ok(SetManager::new(root).list(verbose)?)
}

pub fn set_delete(root: &Path, name: &str, force: bool) -> Result<()> {
    Ok(SetManager::new(root).delete(name, force)?)
}

/// `switch <name>`.
pub fn switch(root: &Path, name: &str) -> Result<()> {
    Ok(SetManager::new(root).switch(name)?)
}

#[derive(Debug, Clone, Copy)]
pub struct StoreOutcome {
    pub hash: ObjectHash,
    pub created: bool,
}

/// `store <file> [--model M]`.
pub fn store_file(root: &Path, file: &Path, model: &str, normalize: bool) -> Result<StoreOutcome> {
    let bytes =
        std::fs::read(file).with_context(|| format!("reading source file {}", file.display()))?;
    let parsed = payload::parse(&bytes)?;
    let source = file.to_string_lossy().into_owned();
    let req = StoreRequest {
        source: &source,
        model,
        file_type: parsed.file_type.as_str(),
        dimensions: Some(parsed.values.len() as u32),
        normalize,
    };
    let report = ops::store(root, &bytes, &req)?;
    Ok(StoreOutcome {
        hash: report.hash,
        created: report.created,
    })
}

/// `log`: the chronological version history for a tracked source.
pub fn log(root: &Path, source: &str) -> Result<Vec<VersionEntry>> {
    Ok(resolve::version_history(root, source)?)
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub current_set: String,
    pub tracked_sources: usize,
}

/// `status`: the current set and how many sources the global index tracks.
pub fn status(root: &Path) -> Result<StatusReport> {
    let current_set = SetManager::new(root).current()?;
    let tracked_sources = workingtree::read_index(root)?.len();
    Ok(StatusReport {
        current_set,
        tracked_sources,
    })
}

#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub source: String,
    pub from: Option<ObjectHash>,
    pub to: ObjectHash,
}

/// `diff`: the most recent two versions of a tracked source, if it has been
/// stored more than once.
pub fn diff(root: &Path, source: &str) -> Result<Option<DiffEntry>> {
    let history = resolve::version_history(root, source)?;
    Ok(match history.len() {
        0 => None,
        1 => Some(DiffEntry {
            source: source.to_string(),
            from: None,
            to: history[0].hash,
        }),
        n => Some(DiffEntry {
            source: source.to_string(),
            from: Some(history[n - 2].hash),
            to: history[n - 1].hash,
        }),
    })
}

/// `push [--force] <remote> [<set>]`. `remote` is looked up by name via
/// `remote::resolve`; callers that already have a URL may pass it directly
/// through `push_to_url` instead.
pub async fn push(root: &Path, remote_name: &str, set: Option<&str>, force: bool) -> Result<PushReport> {
    let url = remote::resolve(root, remote_name)?;
    push_to_url(root, &url, set, force).await
}

pub async fn push_to_url(
    root: &Path,
    url: &str,
    set: Option<&str>,
    force: bool,
) -> Result<PushReport> {
    let set_name = match set {
        Some(s) => s.to_string(),
        None => SetManager::new(root).current()?,
    };
    let mut transport = OpendalTransport::new();
    transport
        .open(url)
        .await
        .map_err(|e| anyhow!("opening remote {url}: {e}"))?;
    embr_transport::push(root, &mut transport, &set_name, force)
        .await
        .map_err(|e| anyhow!("push failed: {e}"))
}

/// `pull [--prune] <remote> [<set>]`.
pub async fn pull(root: &Path, remote_name: &str, set: Option<&str>, prune: bool) -> Result<PullReport> {
    let url = remote::resolve(root, remote_name)?;
    pull_from_url(root, &url, set, prune).await
}

pub async fn pull_from_url(
    root: &Path,
    url: &str,
    set: Option<&str>,
    prune: bool,
) -> Result<PullReport> {
    let set_name = match set {
        Some(s) => s.to_string(),
        None => SetManager::new(root).current()?,
    };
    let mut transport = OpendalTransport::new();
    transport
        .open(url)
        .await
        .map_err(|e| anyhow!("opening remote {url}: {e}"))?;
    embr_transport::pull(root, &mut transport, &set_name, prune)
        .await
        .map_err(|e| anyhow!("pull failed: {e}"))
}

/// `gc [--dry-run] [--prune[=<expire>]] [--no-prune]`.
///
/// `--dry-run` and `--no-prune` are command-surface concerns for an external
/// CLI to map onto `prune_expire`/early-return before calling this; this
/// core always performs the sweep it's asked for.
pub fn gc(root: &Path, prune_expire: Option<&str>, aggressive: bool) -> Result<GcResult> {
    let expire = PruneExpire::parse(prune_expire)?;
    Ok(run_gc(root, expire, aggressive)?)
}

/// `merge <source> [<target>] [--strategy=<name>]`.
pub fn merge(root: &Path, source: &str, target: Option<&str>, strategy: &str) -> Result<MergeReport> {
    let strategy = match strategy {
        "union" => MergeStrategy::Union,
        "mean" => MergeStrategy::Mean,
        "max" => MergeStrategy::Max,
        "weighted" => MergeStrategy::Weighted,
        other => bail!("unknown merge strategy '{other}'"),
    };
    Ok(SetManager::new(root).merge(source, target, strategy)?)
}

/// `remote add|remove|list`.
pub fn remote_add(root: &Path, name: &str, url: &str) -> Result<()> {
    remote::add(root, name, url)
}

pub fn remote_remove(root: &Path, name: &str) -> Result<()> {
    remote::remove(root, name)
}

pub fn remote_list(root: &Path) -> Result<BTreeMap<String, String>> {
    remote::list(root)
}

/// `rollback`: re-point the current set's ref and the global index at an
/// earlier version from `log`, identified by its sequential `version_id`
/// from `log`'s output.
pub fn rollback(root: &Path, source: &str, version_id: u64) -> Result<ObjectHash> {
    let history = resolve::version_history(root, source)?;
    let entry = history
        .into_iter()
        .find(|v| v.id == version_id)
        .ok_or_else(|| anyhow!("no version {version_id} for '{source}'"))?;

    let mgr = SetManager::new(root);
    let current = mgr.current()?;
    mgr.write_ref(&current, source, &entry.hash)?;
    workingtree::rewrite_index(root, &entry.hash, source)?;
    tracing::info!(source, version_id, hash = %entry.hash, "rolled back");
    Ok(entry.hash)
}

/// `rm`: delete an object's on-disk files. Refuses when any set still
/// references it unless `force` is set.
pub fn rm(root: &Path, hash_or_partial: &str, force: bool) -> Result<()> {
    let hash = store::resolve_hash(root, hash_or_partial)?;
    if let Some(set) = referencing_set(root, &hash)? {
        if !force {
            return Err(embr_core::EmbrError::Referenced { hash, set }.into());
        }
        tracing::warn!(%hash, set, "removing object still referenced by a set (forced)");
    }
    let _ = std::fs::remove_file(store::raw_object_path(root, &hash));
    let _ = std::fs::remove_file(store::meta_object_path(root, &hash));
    Ok(())
}

fn referencing_set(root: &Path, hash: &ObjectHash) -> Result<Option<String>> {
    let sets_dir = root.join(".embr").join("sets");
    if !sets_dir.is_dir() {
        return Ok(None);
    }
    let hash_hex = hash.to_hex();
    for entry in std::fs::read_dir(&sets_dir)?.flatten() {
        let refs_dir = entry.path().join("refs");
        if !refs_dir.is_dir() {
            continue;
        }
        for ref_entry in std::fs::read_dir(&refs_dir)?.flatten() {
            if let Ok(contents) = std::fs::read_to_string(ref_entry.path()) {
                if contents.trim() == hash_hex {
                    return Ok(Some(entry.file_name().to_string_lossy().into_owned()));
                }
            }
        }
    }
    Ok(None)
}

#[derive(Debug, Clone)]
pub struct GetOutcome {
    pub hash: ObjectHash,
    pub payload: Vec<u8>,
}

/// `get`: read back an object's decompressed, validated payload.
pub fn get(root: &Path, hash_or_partial: &str) -> Result<GetOutcome> {
    let hash = store::resolve_hash(root, hash_or_partial)?;
    let (payload, _header) = store::read_object(root, &hash)?;
    Ok(GetOutcome { hash, payload })
}

/// `model`: the provider/model recorded against a source's current object.
pub fn model(root: &Path, source: &str) -> Result<Option<String>> {
    let hash = resolve::current_hash(root, source)?;
    let sidecar = store::read_sidecar(root, &hash)?;
    Ok(sidecar.provider().map(str::to_string))
}

/// `hooks`: install a git hook entry into `.embr/config` under
/// `[git "hooks.<name>"]`. Hook shell templates themselves remain out of
/// scope (`spec.md` §1); this only records the command to run.
pub fn hooks_install(root: &Path, name: &str, command: &str) -> Result<()> {
    let config_path = embr_config::config::config_path(root);
    let mut ini = if config_path.exists() {
        ini::Ini::load_from_file(&config_path)
            .map_err(|e| anyhow!("malformed config at {}: {e}", config_path.display()))?
    } else {
        ini::Ini::new()
    };
    let section_name = format!("git \"hooks.{name}\"");
    ini.with_section(Some(section_name)).set("command", command);
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    ini.write_to_file(&config_path)
        .with_context(|| format!("writing {}", config_path.display()))?;
    Ok(())
}

/// `config`: load the effective repository configuration (file plus
/// environment overrides).
pub fn config(root: &Path) -> Result<embr_config::RepoConfig> {
    Ok(embr_config::load(root)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_then_store_then_status_reports_one_tracked_source() {
        let dir = tempdir().unwrap();
        init(dir.path(), false, false, None).unwrap();

        let file = dir.path().join("doc.bin");
        std::fs::write(&file, payload::encode_raw(&[1.0, 2.0, 3.0])).unwrap();
        let outcome = store_file(dir.path(), &file, "openai", false).unwrap();
        assert!(outcome.created);

        let status = status(dir.path()).unwrap();
        assert_eq!(status.current_set, "main");
        assert_eq!(status.tracked_sources, 1);
    }

    #[test]
    fn rollback_repoints_index_to_earlier_version() {
        let dir = tempdir().unwrap();
        init(dir.path(), false, false, None).unwrap();
        let file = dir.path().join("doc.bin");

        std::fs::write(&file, payload::encode_raw(&[1.0])).unwrap();
        let first = store_file(dir.path(), &file, "openai", false).unwrap();
        std::fs::write(&file, payload::encode_raw(&[2.0])).unwrap();
        let _second = store_file(dir.path(), &file, "openai", false).unwrap();

        let source = file.to_string_lossy().into_owned();
        let rolled = rollback(dir.path(), &source, 1).unwrap();
        assert_eq!(rolled, first.hash);
        assert_eq!(resolve::current_hash(dir.path(), &source).unwrap(), first.hash);
    }

    #[test]
    fn rm_without_force_refuses_a_referenced_object() {
        let dir = tempdir().unwrap();
        init(dir.path(), false, false, None).unwrap();
        let file = dir.path().join("doc.bin");
        std::fs::write(&file, payload::encode_raw(&[1.0])).unwrap();
        let outcome = store_file(dir.path(), &file, "openai", false).unwrap();

        let err = rm(dir.path(), &outcome.hash.to_hex(), false).unwrap_err();
        assert!(err.to_string().contains("still referenced"));
    }

    #[test]
    fn remote_add_list_remove_roundtrips() {
        let dir = tempdir().unwrap();
        init(dir.path(), false, false, None).unwrap();
        remote_add(dir.path(), "origin", "file:///tmp/store").unwrap();
        assert_eq!(remote_list(dir.path()).unwrap().len(), 1);
        remote_remove(dir.path(), "origin").unwrap();
        assert!(remote_list(dir.path()).unwrap().is_empty());
    }
}
