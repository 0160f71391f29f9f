//! Scan orchestration.
//!
//! A [`Scanner`] owns the single-flight [`ScanLock`] and drives one run at a
//! time: for every target root, in lexicographic order, it walks the root on
//! the blocking pool, reconciles the batch in one transaction and broadcasts
//! what changed. A full run that finishes every root also retires issues
//! whose root was removed from the configuration.
//!
//! Cancellation is cooperative and checked between roots, so a cancelled
//! run never retires anything under a root it did not finish.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use cs_core::config::Config;
use cs_core::events::{EventBus, EventCategory, EventPayload};
use cs_core::{Error, Result, ScanMode, ScanRun, ScanStatus};
use cs_db::{LibraryStore, ReconcileSummary, RetireScope};
use cs_metadata::Resolver;

use crate::discovery::{self, DiscoveryOptions, FileFailure};
use crate::lock::{ScanGuard, ScanLock};

/// What a call to [`Scanner::rescan`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum RescanOutcome {
    Finished(ScanRun),
    /// Another scan holds the lock; nothing was done.
    AlreadyRunning,
}

/// Coarse scanner state for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

enum RootsOutcome {
    Completed,
    Cancelled,
}

#[derive(Clone)]
pub struct Scanner {
    config: Arc<Config>,
    store: Arc<LibraryStore>,
    resolver: Arc<Resolver>,
    events: Arc<EventBus>,
    lock: Arc<ScanLock>,
    cancel: Arc<Mutex<CancellationToken>>,
    last_run: Arc<RwLock<Option<ScanRun>>>,
}

impl Scanner {
    pub fn new(
        config: Arc<Config>,
        store: Arc<LibraryStore>,
        events: Arc<EventBus>,
        lock: Arc<ScanLock>,
    ) -> Self {
        let resolver = Arc::new(Resolver::from_config(&config.metadata));
        Self {
            config,
            store,
            resolver,
            events,
            lock,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            last_run: Arc::new(RwLock::new(None)),
        }
    }

    pub fn state(&self) -> ScanState {
        if self.lock.is_held() {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    /// The most recent finished run of this scanner.
    pub fn last_run(&self) -> Option<ScanRun> {
        self.last_run.read().clone()
    }

    /// Ask the running scan (if any) to stop at the next root boundary.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Run a scan to completion on the current task.
    ///
    /// Returns immediately with [`RescanOutcome::AlreadyRunning`] if another
    /// scan holds the lock. Failures inside the run end it with status
    /// `Failed`; only lock I/O errors surface as `Err`.
    pub async fn rescan(&self, mode: ScanMode) -> Result<RescanOutcome> {
        let Some(guard) = self.lock.try_acquire()? else {
            tracing::info!(mode = mode.as_str(), "Scan already running, skipping");
            return Ok(RescanOutcome::AlreadyRunning);
        };
        let token = self.fresh_token();
        Ok(RescanOutcome::Finished(self.run(mode, guard, token).await))
    }

    /// Start a scan in the background.
    ///
    /// The lock is taken before this returns, so a `trigger` immediately
    /// followed by [`Scanner::rescan`] reports `AlreadyRunning`. `Ok(None)`
    /// means a scan was already running.
    pub fn trigger(&self, mode: ScanMode) -> Result<Option<JoinHandle<ScanRun>>> {
        let Some(guard) = self.lock.try_acquire()? else {
            tracing::info!(mode = mode.as_str(), "Scan already running, not triggering");
            return Ok(None);
        };
        let token = self.fresh_token();
        let this = self.clone();
        Ok(Some(tokio::spawn(async move { this.run(mode, guard, token).await })))
    }

    /// Replace the cancel token while holding the lock, so a `cancel` issued
    /// right after `trigger` reaches the new run.
    fn fresh_token(&self) -> CancellationToken {
        let mut slot = self.cancel.lock();
        *slot = CancellationToken::new();
        slot.clone()
    }

    async fn run(&self, mode: ScanMode, guard: ScanGuard, token: CancellationToken) -> ScanRun {
        let mut run = ScanRun::start(&mode);
        if let Err(e) = self.store.insert_scan_run(&run) {
            tracing::warn!(run_id = %run.id, error = %e, "Failed to record scan start");
        }
        tracing::info!(run_id = %run.id, mode = %run.mode, "Starting scan");
        self.events.broadcast(
            EventCategory::Admin,
            EventPayload::ScanStarted {
                run_id: run.id,
                mode: run.mode.clone(),
            },
        );

        let result = match self.targets(&mode) {
            Ok(targets) => self.scan_roots(&mut run, &targets, &token).await,
            Err(e) => Err(e),
        };

        let result = match result {
            Ok(RootsOutcome::Completed) if mode == ScanMode::Full => self
                .retire_removed_roots(&mut run)
                .await
                .map(|()| RootsOutcome::Completed),
            other => other,
        };

        match result {
            Ok(RootsOutcome::Completed) => {
                run.finish(ScanStatus::Completed, None);
                tracing::info!(
                    run_id = %run.id,
                    discovered = run.counts.discovered,
                    added = run.counts.added,
                    updated = run.counts.updated,
                    unchanged = run.counts.unchanged,
                    retired = run.counts.retired,
                    failed = run.counts.failed,
                    "Scan complete"
                );
                self.events.broadcast(
                    EventCategory::Admin,
                    EventPayload::ScanCompleted {
                        run_id: run.id,
                        counts: run.counts,
                    },
                );
            }
            Ok(RootsOutcome::Cancelled) => {
                run.finish(ScanStatus::Cancelled, None);
                tracing::info!(run_id = %run.id, "Scan cancelled");
                self.events.broadcast(
                    EventCategory::Admin,
                    EventPayload::ScanCancelled { run_id: run.id },
                );
            }
            Err(e) => {
                run.finish(ScanStatus::Failed, Some(e.to_string()));
                tracing::error!(run_id = %run.id, error = %e, "Scan failed");
                self.events.broadcast(
                    EventCategory::Admin,
                    EventPayload::ScanFailed {
                        run_id: run.id,
                        error: e.to_string(),
                    },
                );
            }
        }

        if let Err(e) = self.store.finish_scan_run(&run) {
            tracing::warn!(run_id = %run.id, error = %e, "Failed to record scan result");
        }
        *self.last_run.write() = Some(run.clone());
        drop(guard);
        run
    }

    /// Roots to walk for `mode`, sorted.
    fn targets(&self, mode: &ScanMode) -> Result<Vec<PathBuf>> {
        let roots = &self.config.library.roots;
        let mut targets = match mode {
            ScanMode::Incremental { paths } if !paths.is_empty() => {
                for p in paths {
                    if !roots.iter().any(|r| p.starts_with(r)) {
                        return Err(Error::Validation(format!(
                            "{} is not inside a configured library root",
                            p.display()
                        )));
                    }
                }
                paths.clone()
            }
            _ => roots.clone(),
        };
        targets.sort();
        targets.dedup();
        Ok(targets)
    }

    async fn scan_roots(
        &self,
        run: &mut ScanRun,
        targets: &[PathBuf],
        token: &CancellationToken,
    ) -> Result<RootsOutcome> {
        let total = targets.len() as u64;
        for (done, root) in targets.iter().enumerate() {
            if token.is_cancelled() {
                return Ok(RootsOutcome::Cancelled);
            }
            self.events.broadcast(
                EventCategory::Admin,
                EventPayload::ScanProgress {
                    run_id: run.id,
                    root: root.display().to_string(),
                    roots_done: done as u64,
                    roots_total: total,
                    counts: run.counts,
                },
            );
            tracing::info!(root = %root.display(), "Starting root scan");

            let (summary, failures) = self.scan_root(root).await?;

            let mut counts = summary.counts;
            counts.discovered += failures.len() as u64;
            counts.failed += failures.len() as u64;
            run.counts.merge(&counts);
            self.announce(run, &summary, &failures);
        }
        Ok(RootsOutcome::Completed)
    }

    /// Discover and reconcile one root on the blocking pool.
    async fn scan_root(&self, root: &Path) -> Result<(ReconcileSummary, Vec<FileFailure>)> {
        let store = Arc::clone(&self.store);
        let resolver = Arc::clone(&self.resolver);
        let config = Arc::clone(&self.config);
        let root = root.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let target = existing_target(&root, &config.library.roots)?;
            let known = store.known_content_ids(&root)?;
            let entries = match target {
                Some(target) => {
                    let options = DiscoveryOptions {
                        library: &config.library,
                        force_hash: config.scan.force_hash,
                    };
                    discovery::discover(&target, &known, &options, &resolver)?
                }
                None => discovery::Discovery::default(),
            };
            // A file that exists but failed to open keeps its issue.
            let scope = RetireScope::within(vec![root])
                .keeping(entries.failures.iter().map(|f| f.path.clone()));
            let summary = store.reconcile(&entries.entries, &scope)?;
            Ok::<_, Error>((summary, entries.failures))
        })
        .await
        .map_err(|e| Error::Internal(format!("scan task panicked: {e}")))?
    }

    async fn retire_removed_roots(&self, run: &mut ScanRun) -> Result<()> {
        let store = Arc::clone(&self.store);
        let roots = self.config.library.roots.clone();
        let retired = tokio::task::spawn_blocking(move || store.retire_outside(&roots))
            .await
            .map_err(|e| Error::Internal(format!("retire task panicked: {e}")))??;
        if !retired.is_empty() {
            tracing::info!(count = retired.len(), "Retired issues outside configured roots");
        }
        run.counts.retired += retired.len() as u64;
        for issue_id in retired {
            self.events
                .broadcast(EventCategory::User, EventPayload::IssueRetired { issue_id });
        }
        Ok(())
    }

    fn announce(&self, run: &ScanRun, summary: &ReconcileSummary, failures: &[FileFailure]) {
        for added in &summary.added {
            self.events.broadcast(
                EventCategory::User,
                EventPayload::IssueAdded {
                    issue_id: added.issue_id,
                    series_id: added.series_id,
                    file_path: added.file_path.display().to_string(),
                },
            );
        }
        for &issue_id in &summary.updated {
            self.events
                .broadcast(EventCategory::User, EventPayload::IssueUpdated { issue_id });
        }
        for &issue_id in &summary.retired {
            self.events
                .broadcast(EventCategory::User, EventPayload::IssueRetired { issue_id });
        }
        let reconcile_failures = summary.failures.iter().map(|(p, m)| (p.as_path(), m.as_str()));
        let discovery_failures = failures.iter().map(|f| (f.path.as_path(), f.message.as_str()));
        for (path, message) in discovery_failures.chain(reconcile_failures) {
            self.events.broadcast(
                EventCategory::Admin,
                EventPayload::ScanFileError {
                    run_id: run.id,
                    file_path: path.display().to_string(),
                    message: message.to_string(),
                },
            );
        }
    }
}

/// Decide what to walk for a target path.
///
/// A configured root must exist. A narrower incremental path that no longer
/// exists is walked as empty, so everything indexed under it is retired,
/// provided its root is still there.
fn existing_target(target: &Path, roots: &[PathBuf]) -> Result<Option<PathBuf>> {
    if target.exists() {
        return Ok(Some(target.to_path_buf()));
    }
    let is_root = roots.iter().any(|r| r == target);
    let root_present = roots
        .iter()
        .any(|r| target.starts_with(r) && r.is_dir());
    if is_root || !root_present {
        return Err(Error::root_unavailable(target, "no such file or directory"));
    }
    Ok(None)
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("state", &self.state())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
