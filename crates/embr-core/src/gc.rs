//! Lockfile-guarded garbage collection.
//!
//! Lock state machine: `unlocked -> locking -> locked -> releasing ->
//! unlocked`, with stale-lock recovery a legal transition from
//! `unlocked`/`locking` when the recorded pid no longer exists.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EmbrError;
use crate::sets::sanitize_ref_name;

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;
const TWO_WEEKS: u64 = 2 * WEEK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    fn seconds(self) -> u64 {
        match self {
            Self::Seconds => SECOND,
            Self::Minutes => MINUTE,
            Self::Hours => HOUR,
            Self::Days => DAY,
            Self::Weeks => WEEK,
            Self::Months => MONTH,
            Self::Years => YEAR,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "seconds" => Some(Self::Seconds),
            "minutes" => Some(Self::Minutes),
            "hours" => Some(Self::Hours),
            "days" => Some(Self::Days),
            "weeks" => Some(Self::Weeks),
            "months" => Some(Self::Months),
            "years" => Some(Self::Years),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PruneExpire {
    Never,
    Now,
    Ago { amount: u64, unit: TimeUnit },
    Default,
}

impl PruneExpire {
    /// Parse `never`, `now`, `<N>.<unit>.ago`, or fall back to `Default`.
    pub fn parse(s: Option<&str>) -> Result<Self, EmbrError> {
        let Some(s) = s else {
            return Ok(Self::Default);
        };
        match s {
            "never" => Ok(Self::Never),
            "now" => Ok(Self::Now),
            other => {
                let parts: Vec<&str> = other.splitn(3, '.').collect();
                let [amount, unit, ago] = parts[..] else {
                    return Err(EmbrError::InvalidInput(format!(
                        "invalid prune expiry '{other}', expected '<N>.<unit>.ago'"
                    )));
                };
                if ago != "ago" {
                    return Err(EmbrError::InvalidInput(format!(
                        "invalid prune expiry '{other}', expected '<N>.<unit>.ago'"
                    )));
                }
                let amount: u64 = amount.parse().map_err(|_| {
                    EmbrError::InvalidInput(format!("invalid prune expiry amount in '{other}'"))
                })?;
                let unit = TimeUnit::parse(unit).ok_or_else(|| {
                    EmbrError::InvalidInput(format!("unknown time unit in '{other}'"))
                })?;
                Ok(Self::Ago { amount, unit })
            }
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Resolve a `PruneExpire` into an absolute expiry time, or `None` if GC
/// should no-op (`never`).
fn resolve_expiry(expire: PruneExpire) -> Option<u64> {
    let now = now_secs();
    match expire {
        PruneExpire::Never => None,
        PruneExpire::Now => Some(now),
        PruneExpire::Ago { amount, unit } => Some(now.saturating_sub(amount * unit.seconds())),
        PruneExpire::Default => Some(now.saturating_sub(TWO_WEEKS)),
    }
}

fn lock_path(root: &Path) -> PathBuf {
    root.join(".embr").join("gc.lock")
}

fn objects_dir(root: &Path) -> PathBuf {
    root.join(".embr").join("objects")
}

fn sets_dir(root: &Path) -> PathBuf {
    root.join(".embr").join("sets")
}

fn pid_is_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // Signal 0 performs no-op permission/existence checks only.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

/// `true` if the recorded lock holder is still alive.
pub fn is_running(root: &Path) -> bool {
    let path = lock_path(root);
    match fs::read_to_string(&path) {
        Ok(contents) => contents
            .trim()
            .parse::<u32>()
            .map(pid_is_running)
            .unwrap_or(false),
        Err(_) => false,
    }
}

struct GcLock {
    path: PathBuf,
}

impl GcLock {
    fn acquire(root: &Path) -> Result<Self, EmbrError> {
        let path = lock_path(root);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(format!("{}\n", std::process::id()).as_bytes())
                    .map_err(|e| EmbrError::file_io(&path, e))?;
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_running(root) {
                    Err(EmbrError::LockFailed {
                        path: path.clone(),
                        reason: "another gc is already running".to_string(),
                    })
                } else {
                    tracing::warn!(path = %path.display(), "removing stale gc lock");
                    fs::remove_file(&path).map_err(|e| EmbrError::file_io(&path, e))?;
                    Self::acquire(root)
                }
            }
            Err(e) => Err(EmbrError::LockFailed {
                path,
                reason: e.to_string(),
            }),
        }
    }
}

impl Drop for GcLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GcResult {
    pub objects_removed: u64,
    pub bytes_freed: u64,
}

/// Collect the set of hash stems still referenced by any set.
fn referenced_hashes(root: &Path) -> Result<std::collections::HashSet<String>, EmbrError> {
    let mut referenced = std::collections::HashSet::new();
    let dir = sets_dir(root);
    if !dir.is_dir() {
        return Ok(referenced);
    }
    for set_entry in fs::read_dir(&dir).map_err(|e| EmbrError::file_io(&dir, e))?.flatten() {
        let refs_dir = set_entry.path().join("refs");
        if !refs_dir.is_dir() {
            continue;
        }
        for ref_entry in fs::read_dir(&refs_dir).map_err(|e| EmbrError::file_io(&refs_dir, e))?.flatten() {
            if let Ok(hash) = fs::read_to_string(ref_entry.path()) {
                referenced.insert(hash.trim().to_string());
            }
        }
    }
    Ok(referenced)
}

/// Run a garbage collection sweep. `aggressive` is accepted but carries no
/// additional required behavior in this core (see `spec.md` §4.7).
pub fn run_gc(root: &Path, prune_expire: PruneExpire, aggressive: bool) -> Result<GcResult, EmbrError> {
    let _lock = GcLock::acquire(root)?;
    let _ = aggressive;

    let Some(expiry) = resolve_expiry(prune_expire) else {
        return Ok(GcResult::default());
    };

    let referenced = referenced_hashes(root)?;
    let dir = objects_dir(root);
    let mut result = GcResult::default();
    if !dir.is_dir() {
        return Ok(result);
    }

    for entry in fs::read_dir(&dir).map_err(|e| EmbrError::file_io(&dir, e))?.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let Some(stem) = name.split('.').next() else {
            continue;
        };
        if referenced.contains(stem) || referenced.contains(&sanitize_ref_name(stem)) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let modified_secs = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if modified_secs < expiry {
            let len = metadata.len();
            if fs::remove_file(&path).is_ok() {
                result.bytes_freed += len;
                if name.ends_with(".raw") {
                    result.objects_removed += 1;
                }
            }
        }
    }

    tracing::info!(
        removed = result.objects_removed,
        bytes = result.bytes_freed,
        "gc sweep complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo;
    use crate::sets::SetManager;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn unreferenced_old_object_is_removed_but_referenced_is_kept() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let objects = objects_dir(dir.path());

        let h1 = crate::hash::hash_payload(b"referenced");
        let h2 = crate::hash::hash_payload(b"unreferenced");
        fs::write(objects.join(format!("{h1}.raw")), b"x").unwrap();
        fs::write(objects.join(format!("{h2}.raw")), b"x").unwrap();

        let mgr = SetManager::new(dir.path());
        mgr.write_ref("main", "doc.txt", &h1).unwrap();

        // Backdate h2's mtime well past the expiry window.
        let old = SystemTime::now() - Duration::from_secs(TWO_WEEKS * 3);
        filetime::set_file_mtime(
            objects.join(format!("{h2}.raw")),
            filetime::FileTime::from_system_time(old),
        )
        .unwrap();

        let result = run_gc(dir.path(), PruneExpire::Default, false).unwrap();
        assert_eq!(result.objects_removed, 1);
        assert!(objects.join(format!("{h1}.raw")).exists());
        assert!(!objects.join(format!("{h2}.raw")).exists());
    }

    #[test]
    fn never_expiry_is_a_no_op() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let result = run_gc(dir.path(), PruneExpire::Never, false).unwrap();
        assert_eq!(result.objects_removed, 0);
    }

    #[test]
    fn concurrent_gc_is_rejected() {
        let dir = tempdir().unwrap();
        repo::init(dir.path(), false).unwrap();
        let _lock = GcLock::acquire(dir.path()).unwrap();
        let err = GcLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, EmbrError::LockFailed { .. }));
    }

    #[test]
    fn parses_ago_expiry_strings() {
        assert!(matches!(PruneExpire::parse(Some("2.weeks.ago")).unwrap(), PruneExpire::Ago { amount: 2, unit: TimeUnit::Weeks }));
        assert!(matches!(PruneExpire::parse(Some("never")).unwrap(), PruneExpire::Never));
        assert!(PruneExpire::parse(Some("garbage")).is_err());
    }
}
