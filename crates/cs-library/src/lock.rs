//! Single-flight scan lock with an on-disk crash marker.
//!
//! Within the process the lock is an atomic flag. While a scan holds it a
//! marker file records the owning pid and start time; the [`ScanGuard`]
//! removes the marker when dropped. A marker whose pid is no longer running
//! means that process died mid-scan; [`ScanLock::recover_stale`] clears it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::Utc;
use cs_core::Result;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// An empty marker younger than this is still being written.
const FRESH_MARKER: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct ScanLock {
    marker: PathBuf,
    held: AtomicBool,
    recovery: Once,
}

impl ScanLock {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            held: AtomicBool::new(false),
            recovery: Once::new(),
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Remove a marker left behind by an unclean shutdown.
    ///
    /// A marker is stale when the pid it records no longer runs, or when it
    /// records no pid at all (unless it is empty and only just created). A
    /// marker owned by a live process is left alone. Only the first call
    /// does anything. Returns `true` if a stale marker was removed.
    pub fn recover_stale(&self) -> bool {
        let mut removed = false;
        self.recovery.call_once(|| {
            if self.is_held() {
                return;
            }
            let contents = match std::fs::read_to_string(&self.marker) {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    tracing::warn!(path = %self.marker.display(), error = %e, "Failed to read scan marker");
                    return;
                }
            };
            match marker_pid(&contents) {
                Some(pid) if process_running(pid) => {
                    tracing::info!(path = %self.marker.display(), pid, "Scan marker belongs to a running process");
                    return;
                }
                // Created but not yet written by its owner.
                None if contents.trim().is_empty() && self.marker_age() < FRESH_MARKER => {
                    tracing::info!(path = %self.marker.display(), "Scan marker is being written");
                    return;
                }
                _ => {}
            }
            match std::fs::remove_file(&self.marker) {
                Ok(()) => {
                    tracing::warn!(
                        path = %self.marker.display(),
                        previous = %contents.trim().replace('\n', " "),
                        "Cleared stale scan marker from an interrupted scan"
                    );
                    removed = true;
                }
                Err(e) => {
                    tracing::warn!(path = %self.marker.display(), error = %e, "Failed to clear stale scan marker");
                }
            }
        });
        removed
    }

    fn marker_age(&self) -> Duration {
        std::fs::metadata(&self.marker)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or(Duration::MAX)
    }

    /// Take the lock if nobody holds it. `Ok(None)` means a scan is already
    /// running.
    pub fn try_acquire(self: &Arc<Self>) -> Result<Option<ScanGuard>> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }

        // Construct the guard first so every exit below releases the flag.
        let mut guard = ScanGuard {
            lock: Arc::clone(self),
            owns_marker: false,
        };
        if self.write_marker(&mut guard)? {
            Ok(Some(guard))
        } else {
            tracing::info!(path = %self.marker.display(), "Scan marker held by another process");
            Ok(None)
        }
    }

    /// Create the marker exclusively. `Ok(false)` if it already exists.
    fn write_marker(&self, guard: &mut ScanGuard) -> Result<bool> {
        if let Some(parent) = self.marker.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.marker)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        guard.owns_marker = true;
        writeln!(file, "pid={}", std::process::id())?;
        writeln!(file, "started_at={}", Utc::now().to_rfc3339())?;
        Ok(true)
    }
}

fn marker_pid(contents: &str) -> Option<u32> {
    contents
        .lines()
        .find_map(|line| line.trim().strip_prefix("pid="))
        .and_then(|pid| pid.trim().parse().ok())
}

fn process_running(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}

/// Proof of holding the [`ScanLock`]. Dropping it releases the lock.
#[derive(Debug)]
pub struct ScanGuard {
    lock: Arc<ScanLock>,
    owns_marker: bool,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if self.owns_marker {
            match std::fs::remove_file(&self.lock.marker) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %self.lock.marker.display(), error = %e, "Failed to remove scan marker");
                }
            }
        }
        self.lock.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_in(dir: &Path) -> Arc<ScanLock> {
        Arc::new(ScanLock::new(dir.join("scan.lock")))
    }

    #[test]
    fn second_acquire_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path());

        let guard = lock.try_acquire().unwrap().unwrap();
        assert!(lock.is_held());
        assert!(lock.marker_path().exists());
        assert!(lock.try_acquire().unwrap().is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(!lock.marker_path().exists());
        assert!(lock.try_acquire().unwrap().is_some());
    }

    #[test]
    fn marker_records_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path());
        let _guard = lock.try_acquire().unwrap().unwrap();
        let contents = std::fs::read_to_string(lock.marker_path()).unwrap();
        assert!(contents.contains(&format!("pid={}", std::process::id())));
        assert!(contents.contains("started_at="));
    }

    /// Far above any kernel's pid range.
    const DEAD_PID: u32 = 999_999_999;

    #[test]
    fn dead_owner_marker_blocks_until_recovered_once() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path());
        let stale = format!("pid={DEAD_PID}\nstarted_at=2026-01-01T00:00:00Z\n");
        std::fs::write(lock.marker_path(), &stale).unwrap();

        assert!(lock.try_acquire().unwrap().is_none());
        assert!(!lock.is_held());

        assert!(lock.recover_stale());
        assert!(!lock.marker_path().exists());

        // Recovery runs at most once.
        std::fs::write(lock.marker_path(), &stale).unwrap();
        assert!(!lock.recover_stale());
        assert!(lock.marker_path().exists());
    }

    #[test]
    fn live_owner_marker_survives_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let running = lock_in(dir.path());
        let _guard = running.try_acquire().unwrap().unwrap();

        let other = lock_in(dir.path());
        assert!(!other.recover_stale());
        assert!(other.marker_path().exists());
        assert!(other.try_acquire().unwrap().is_none());
    }

    #[test]
    fn marker_without_pid_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path());
        std::fs::write(lock.marker_path(), "garbage").unwrap();
        assert!(lock.recover_stale());
        assert!(!lock.marker_path().exists());
    }

    #[test]
    fn fresh_empty_marker_is_left_for_its_writer() {
        let dir = tempfile::tempdir().unwrap();
        let lock = lock_in(dir.path());
        std::fs::write(lock.marker_path(), "").unwrap();
        assert!(!lock.recover_stale());
        assert!(lock.marker_path().exists());
    }

    #[test]
    fn pid_is_read_from_any_line() {
        assert_eq!(marker_pid("started_at=x\npid=42\n"), Some(42));
        assert_eq!(marker_pid("pid=abc"), None);
        assert_eq!(marker_pid(""), None);
        assert!(process_running(std::process::id()));
        assert!(!process_running(DEAD_PID));
    }

    #[test]
    fn recover_without_marker_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!lock_in(dir.path()).recover_stale());
    }

    #[test]
    fn marker_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let lock = Arc::new(ScanLock::new(dir.path().join("data").join("scan.lock")));
        let _guard = lock.try_acquire().unwrap().unwrap();
        assert!(dir.path().join("data").join("scan.lock").exists());
    }
}
