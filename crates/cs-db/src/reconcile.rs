//! Transactional reconciliation of a discovery batch against the store.
//!
//! One batch is applied inside a single SQLite transaction. Every entry gets
//! its own savepoint, so a failing row is rolled back on its own and the
//! rest of the batch still commits.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use cs_core::{
    DiscoveredComic, Error, IssueId, Result, ScanCounts, ScannedFile, SeriesId,
};
use rusqlite::Connection;

use crate::queries::{issues, series};

/// Which non-retired issues a reconcile may retire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetireScope {
    /// Retire nothing.
    Nothing,
    /// Retire live issues under any of `roots` that the batch did not
    /// contain. Issues at or below a `keep` path survive even when absent:
    /// those files exist but could not be read this time.
    Within {
        roots: Vec<PathBuf>,
        keep: Vec<PathBuf>,
    },
}

impl RetireScope {
    pub fn within(roots: Vec<PathBuf>) -> Self {
        RetireScope::Within {
            roots,
            keep: Vec::new(),
        }
    }

    /// Protect `paths` from retirement. No effect on [`RetireScope::Nothing`].
    #[must_use]
    pub fn keeping(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        if let RetireScope::Within { keep, .. } = &mut self {
            keep.extend(paths);
        }
        self
    }

    fn covers(&self, path: &Path) -> bool {
        match self {
            RetireScope::Nothing => false,
            RetireScope::Within { roots, keep } => {
                roots.iter().any(|r| path.starts_with(r))
                    && !keep.iter().any(|k| path.starts_with(k))
            }
        }
    }
}

/// A newly inserted issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedIssue {
    pub issue_id: IssueId,
    pub series_id: SeriesId,
    pub file_path: PathBuf,
}

/// Outcome of one reconcile call.
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    pub counts: ScanCounts,
    pub added: Vec<AddedIssue>,
    pub updated: Vec<IssueId>,
    pub retired: Vec<IssueId>,
    /// Per-entry failures as `(path, message)`.
    pub failures: Vec<(PathBuf, String)>,
}

enum Applied {
    Added(AddedIssue),
    Updated(IssueId),
    Unchanged,
}

/// Apply `entries` and retire according to `scope`, all in one transaction.
///
/// Callers must serialize writers; see [`crate::LibraryStore`].
pub fn reconcile(
    conn: &Connection,
    entries: &[ScannedFile],
    scope: &RetireScope,
) -> Result<ReconcileSummary> {
    let mut tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let mut summary = ReconcileSummary::default();
    summary.counts.discovered = entries.len() as u64;
    let mut seen: HashSet<String> = HashSet::with_capacity(entries.len());

    for entry in entries {
        let path = entry.path();
        let key = path.to_string_lossy().into_owned();

        if !seen.insert(key.clone()) {
            let err = Error::ReconciliationConflict(format!(
                "{} appears more than once in the batch",
                path.display()
            ));
            tracing::warn!(path = %path.display(), error = %err, "Skipping duplicate entry");
            summary.counts.conflicts += 1;
            continue;
        }

        let sp = tx.savepoint().map_err(|e| Error::database(e.to_string()))?;
        match apply_entry(&sp, entry, &key) {
            Ok(applied) => {
                sp.commit().map_err(|e| Error::database(e.to_string()))?;
                match applied {
                    Applied::Added(added) => {
                        summary.counts.added += 1;
                        summary.added.push(added);
                    }
                    Applied::Updated(id) => {
                        summary.counts.updated += 1;
                        summary.updated.push(id);
                    }
                    Applied::Unchanged => summary.counts.unchanged += 1,
                }
            }
            Err(e) => {
                // Dropping the savepoint rolls it back.
                drop(sp);
                tracing::warn!(path = %path.display(), error = %e, "Failed to reconcile entry");
                summary.counts.failed += 1;
                summary.failures.push((path.to_path_buf(), e.to_string()));
            }
        }
    }

    if *scope != RetireScope::Nothing {
        for (id, file_path, _) in issues::list_active_files(&tx)? {
            if seen.contains(&file_path) || !scope.covers(Path::new(&file_path)) {
                continue;
            }
            if issues::retire_issue(&tx, id)? {
                tracing::debug!(issue_id = %id, path = %file_path, "Retired issue");
                summary.counts.retired += 1;
                summary.retired.push(id);
            }
        }
    }

    series::refresh_issue_counts(&tx)?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(summary)
}

/// Retire every live issue not located under any of `roots`.
pub fn retire_outside(conn: &Connection, roots: &[PathBuf]) -> Result<Vec<IssueId>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let mut retired = Vec::new();
    for (id, file_path, _) in issues::list_active_files(&tx)? {
        let path = Path::new(&file_path);
        if roots.iter().any(|r| path.starts_with(r)) {
            continue;
        }
        if issues::retire_issue(&tx, id)? {
            tracing::debug!(issue_id = %id, path = %file_path, "Retired issue outside roots");
            retired.push(id);
        }
    }

    series::refresh_issue_counts(&tx)?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(retired)
}

fn apply_entry(conn: &Connection, entry: &ScannedFile, path: &str) -> Result<Applied> {
    match entry {
        ScannedFile::Unchanged { .. } => match issues::get_active_by_path(conn, path)? {
            Some(_) => Ok(Applied::Unchanged),
            None => Err(Error::not_found("issue", path)),
        },
        ScannedFile::Changed(comic) => apply_changed(conn, comic, path),
    }
}

fn apply_changed(conn: &Connection, comic: &DiscoveredComic, path: &str) -> Result<Applied> {
    let meta = &comic.metadata;
    let series_id = SeriesId::from_key(&meta.series_key);
    series::ensure_series(
        conn,
        series_id,
        &meta.series_key,
        &meta.series,
        meta.sort_name.as_deref(),
    )?;

    match issues::get_active_by_path(conn, path)? {
        None => {
            let issue_id = IssueId::new();
            issues::insert_issue(conn, issue_id, series_id, comic)?;
            Ok(Applied::Added(AddedIssue {
                issue_id,
                series_id,
                file_path: comic.path.clone(),
            }))
        }
        // Same bytes can still resolve to a new placeholder number.
        Some(existing)
            if existing.content_id == comic.content_id.as_str()
                && existing.number.as_str() == meta.number.as_str() =>
        {
            Ok(Applied::Unchanged)
        }
        Some(existing) => {
            issues::update_issue_content(conn, existing.id, series_id, comic)?;
            Ok(Applied::Updated(existing.id))
        }
    }
}
