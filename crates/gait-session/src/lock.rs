// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-level journal lock: an in-process mutex keyed by lock path, then a
//! cross-process lock file created with `O_CREATE|O_EXCL`.

use crate::config::SessionLockConfig;
use gait_error::{GaitError, GaitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize)]
struct LockFileContents {
    pid: u32,
    created_at: u64,
}

fn process_locks() -> &'static Mutex<HashMap<PathBuf, &'static Mutex<()>>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn in_process_mutex(path: &Path) -> &'static Mutex<()> {
    let mut locks = process_locks().lock().unwrap_or_else(|e| e.into_inner());
    if let Some(existing) = locks.get(path) {
        return existing;
    }
    let leaked: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    locks.insert(path.to_path_buf(), leaked);
    leaked
}

/// Held for the duration of one critical section. Releases both the
/// in-process mutex and the cross-process lock file on drop, matching
/// the RAII guard idiom used for the archive's and sign's resource
/// handling.
pub struct SessionLockGuard {
    lock_file_path: PathBuf,
    _process_guard: MutexGuard<'static, ()>,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_file_path);
    }
}

/// Acquires the two-level lock for `journal_path`, retrying at
/// `config.retry()` intervals until `config.timeout()` elapses.
///
/// # Errors
///
/// Returns [`GaitError::LockContention`] on timeout, or
/// [`GaitError::Io`] if the lock file cannot be inspected or removed.
pub fn acquire_lock(journal_path: &Path, profile: &str, config: &SessionLockConfig) -> GaitResult<SessionLockGuard> {
    let lock_file_path = lock_path_for(journal_path);
    let _span = tracing::info_span!(
        "gait_session.acquire_lock",
        lock_path = %lock_file_path.display(),
        profile
    )
    .entered();

    let process_guard = in_process_mutex(&lock_file_path)
        .lock()
        .unwrap_or_else(|e| e.into_inner());

    let start = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match try_create_lock_file(&lock_file_path) {
            Ok(()) => {
                tracing::debug!(
                    target: "gait.session",
                    lock_path = %lock_file_path.display(),
                    attempts,
                    "acquired lock"
                );
                return Ok(SessionLockGuard {
                    lock_file_path,
                    _process_guard: process_guard,
                });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                reap_if_stale(&lock_file_path, config.stale_after())?;
                if start.elapsed() >= config.timeout() {
                    tracing::warn!(
                        target: "gait.session",
                        lock_path = %lock_file_path.display(),
                        attempts,
                        waited_ms = start.elapsed().as_millis() as u64,
                        "lock acquisition timed out"
                    );
                    return Err(GaitError::LockContention {
                        lock_path: lock_file_path.clone(),
                        waited_ms: start.elapsed().as_millis() as u64,
                        attempts,
                        timeout_ms: config.timeout_ms,
                        retry_ms: config.retry_ms,
                        profile: profile.to_string(),
                    });
                }
                std::thread::sleep(config.retry());
            }
            Err(e) => return Err(GaitError::from(e)),
        }
    }
}

fn lock_path_for(journal_path: &Path) -> PathBuf {
    let mut os_string = journal_path.as_os_str().to_os_string();
    os_string.push(".lock");
    PathBuf::from(os_string)
}

fn try_create_lock_file(lock_file_path: &Path) -> std::io::Result<()> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_file_path)?;
    let contents = LockFileContents {
        pid: std::process::id(),
        created_at: unix_millis_now(),
    };
    let bytes = serde_json::to_vec(&contents).unwrap_or_default();
    file.write_all(&bytes)
}

fn reap_if_stale(lock_file_path: &Path, stale_after: Duration) -> GaitResult<()> {
    let Ok(bytes) = fs::read(lock_file_path) else {
        return Ok(());
    };
    let Ok(contents) = serde_json::from_slice::<LockFileContents>(&bytes) else {
        return Ok(());
    };
    let age_ms = unix_millis_now().saturating_sub(contents.created_at);
    if age_ms as u128 > stale_after.as_millis() {
        match fs::remove_file(lock_file_path) {
            Ok(()) | Err(_) if !lock_file_path.exists() => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GaitError::from(e)),
            Ok(()) => Ok(()),
        }
    } else {
        Ok(())
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
