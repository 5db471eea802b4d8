//! Single-instance process lock.
//!
//! Mutating commands take an advisory `flock` on a file in the state
//! directory so two frevo runs cannot interleave writes to httpd or
//! dnsmasq configuration. The kernel drops the lock when the process
//! exits, so a crashed run never leaves anything to clean up; the file
//! contents only identify the current holder for error messages.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use fd_lock::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

const LOCK_FILE: &str = "frevo.lock";

/// Identity of the process holding the lock, stored as JSON in the
/// lock file for diagnostics only.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Local>,
}

/// Handle on the lock file. Must outlive the guard returned by
/// [`acquire`].
pub struct Lock {
    path: PathBuf,
    inner: RwLock<File>,
}

/// Open (creating if necessary) the lock file under `state_dir`.
pub fn open(state_dir: &Path) -> Result<Lock> {
    fs::create_dir_all(state_dir)
        .with_context(|| format!("failed to create {}", state_dir.display()))?;
    let path = state_dir.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Lock {
        path,
        inner: RwLock::new(file),
    })
}

/// Take the exclusive lock, or return `None` when `wanted` is false
/// (read-only and dry-run invocations skip locking entirely).
///
/// Fails fast instead of blocking when another frevo process holds the
/// lock, naming the holder if its info is readable.
pub fn acquire(lock: &mut Lock, wanted: bool) -> Result<Option<RwLockWriteGuard<'_, File>>> {
    if !wanted {
        return Ok(None);
    }

    let path = lock.path.clone();
    let mut guard = match lock.inner.try_write() {
        Ok(guard) => guard,
        Err(err) if err.kind() == ErrorKind::WouldBlock => {
            bail!("{}", holder_message(&path));
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to lock {}", path.display()));
        }
    };

    let info = LockInfo {
        pid: std::process::id(),
        acquired_at: Local::now(),
    };
    let json = serde_json::to_string_pretty(&info)?;
    guard.set_len(0)?;
    guard.seek(SeekFrom::Start(0))?;
    guard.write_all(json.as_bytes())?;
    guard.flush()?;
    log::debug!("acquired process lock at {}", path.display());

    Ok(Some(guard))
}

fn holder_message(path: &Path) -> String {
    match read_info(path) {
        Some(info) => format!(
            "another frevo process is already running (pid {}, since {})",
            info.pid,
            info.acquired_at.format("%Y-%m-%d %H:%M:%S"),
        ),
        None => "another frevo process is already running".to_string(),
    }
}

fn read_info(path: &Path) -> Option<LockInfo> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_writes_holder_info() {
        let dir = TempDir::new().unwrap();
        let mut lock = open(dir.path()).unwrap();
        let guard = acquire(&mut lock, true).unwrap();
        assert!(guard.is_some());

        let content = fs::read_to_string(dir.path().join(LOCK_FILE)).unwrap();
        let info: LockInfo = serde_json::from_str(&content).unwrap();
        assert_eq!(info.pid, std::process::id());
    }

    #[test]
    fn skipped_acquire_returns_none() {
        let dir = TempDir::new().unwrap();
        let mut lock = open(dir.path()).unwrap();
        let guard = acquire(&mut lock, false).unwrap();
        assert!(guard.is_none());

        let content = fs::read_to_string(dir.path().join(LOCK_FILE)).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn second_acquire_reports_holder() {
        let dir = TempDir::new().unwrap();
        let mut first = open(dir.path()).unwrap();
        let _guard = acquire(&mut first, true).unwrap();

        // flock is held per open file description, so a second handle in
        // the same process still contends.
        let mut second = open(dir.path()).unwrap();
        let err = acquire(&mut second, true).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("already running"), "{message}");
        assert!(
            message.contains(&std::process::id().to_string()),
            "{message}"
        );
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        {
            let mut lock = open(dir.path()).unwrap();
            let _guard = acquire(&mut lock, true).unwrap();
        }
        let mut lock = open(dir.path()).unwrap();
        assert!(acquire(&mut lock, true).unwrap().is_some());
    }

    #[test]
    fn open_creates_state_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("state").join("frevo");
        open(&nested).unwrap();
        assert!(nested.join(LOCK_FILE).exists());
    }
}
