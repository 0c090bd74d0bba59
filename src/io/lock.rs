//! Lock file management for single-instance enforcement.
//!
//! Two daemons driving the same relays would defeat the busy guard, so only
//! one coopd may run per user. The lock file holds the owner's PID; a lock
//! left behind by a dead process is cleaned up and retried once.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::common::utils::runtime_dir;

/// An acquired instance lock. Dropping it releases the lock and removes the file.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn lock_path() -> PathBuf {
    runtime_dir().join(LOCK_FILE_NAME)
}

/// Acquire the lock at the default location.
pub fn acquire_lock() -> Result<InstanceLock> {
    acquire_lock_at(&lock_path())
}

/// Acquire an exclusive lock on `path`, writing our PID into it.
///
/// Fails if another live process holds it.
pub fn acquire_lock_at(path: &Path) -> Result<InstanceLock> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create lock directory {}", parent.display()))?;
    }

    match try_lock(path)? {
        Some(lock) => Ok(lock),
        None => {
            handle_lock_conflict(path)?;
            try_lock(path)?.with_context(|| {
                format!("Failed to acquire lock {} after cleanup", path.display())
            })
        }
    }
}

fn try_lock(path: &Path) -> Result<Option<InstanceLock>> {
    // Open without truncating so a competing owner's PID stays readable
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(InstanceLock {
        file,
        path: path.to_path_buf(),
    }))
}

/// Decide whether a held lock is stale.
///
/// Returns `Ok(())` when the lock was left by a dead process and has been
/// removed; errors when a live coopd owns it.
fn handle_lock_conflict(path: &Path) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Ok(()),
    };

    let Ok(pid) = content.trim().parse::<i32>() else {
        log_warning!("Lock file contains invalid PID, removing stale lock");
        let _ = std::fs::remove_file(path);
        return Ok(());
    };

    if !is_process_running(pid) {
        log_warning!("Removing stale lock file (process {pid} no longer running)");
        let _ = std::fs::remove_file(path);
        return Ok(());
    }

    bail!("coopd is already running (PID: {pid})")
}

fn is_process_running(pid: i32) -> bool {
    pid > 0 && kill(Pid::from_raw(pid), None).is_ok()
}
