//! [`LibraryStore`]: the handle the scanner and the read side share.
//!
//! Writers (reconcile, retire, prune, progress) are serialized through a
//! mutex; readers take a pooled connection and never wait on it. With WAL
//! journaling a reader only sees committed transactions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cs_core::{ContentId, Error, IssueId, Result, ScanRun, ScannedFile, SeriesId};
use parking_lot::Mutex;

use crate::models::{Issue, Series};
use crate::pool::{self, DbPool, PooledConnection};
use crate::queries::{issues, scan_runs, series};
use crate::reconcile::{self, ReconcileSummary, RetireScope};

pub struct LibraryStore {
    pool: DbPool,
    writer: Mutex<()>,
}

impl LibraryStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            writer: Mutex::new(()),
        }
    }

    /// Open (or create) the database file and run migrations.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::new(pool::init_pool(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(pool::init_memory_pool()?))
    }

    fn conn(&self) -> Result<PooledConnection> {
        pool::get_conn(&self.pool)
    }

    // -- writes -------------------------------------------------------------

    /// Apply a discovery batch. See [`reconcile::reconcile`].
    pub fn reconcile(&self, entries: &[ScannedFile], scope: &RetireScope) -> Result<ReconcileSummary> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        reconcile::reconcile(&conn, entries, scope)
    }

    /// Retire live issues that are not under any configured root.
    pub fn retire_outside(&self, roots: &[PathBuf]) -> Result<Vec<IssueId>> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        reconcile::retire_outside(&conn, roots)
    }

    /// Record reading progress for an issue.
    pub fn set_progress(&self, id: IssueId, current_page: u32, is_read: bool) -> Result<()> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        if issues::set_progress(&conn, id, current_page, is_read)? {
            Ok(())
        } else {
            Err(Error::not_found("issue", id))
        }
    }

    /// Delete series without live issues. Their retired issues go with them.
    pub fn prune_series(&self) -> Result<usize> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        let n = series::delete_empty_series(&conn)?;
        if n > 0 {
            tracing::info!(count = n, "Pruned empty series");
        }
        Ok(n)
    }

    /// Permanently delete retired issue rows.
    pub fn purge_retired(&self) -> Result<usize> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        let n = issues::purge_retired(&conn)?;
        series::refresh_issue_counts(&conn)?;
        Ok(n)
    }

    pub fn insert_scan_run(&self, run: &ScanRun) -> Result<()> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        scan_runs::insert_scan_run(&conn, run)
    }

    pub fn finish_scan_run(&self, run: &ScanRun) -> Result<()> {
        let _w = self.writer.lock();
        let conn = self.conn()?;
        scan_runs::update_scan_run(&conn, run)
    }

    // -- reads --------------------------------------------------------------

    /// Indexed content identity of every live issue under `root`.
    pub fn known_content_ids(&self, root: &Path) -> Result<HashMap<PathBuf, ContentId>> {
        let conn = self.conn()?;
        Ok(issues::list_active_files(&conn)?
            .into_iter()
            .map(|(_, path, content_id)| (PathBuf::from(path), ContentId::from_stored(content_id)))
            .filter(|(path, _)| path.starts_with(root))
            .collect())
    }

    pub fn list_series(&self) -> Result<Vec<Series>> {
        let conn = self.conn()?;
        series::list_series(&conn)
    }

    pub fn get_series(&self, id: SeriesId) -> Result<Series> {
        let conn = self.conn()?;
        series::get_series(&conn, id)?.ok_or_else(|| Error::not_found("series", id))
    }

    /// Live issues of a series in reading order. Unknown series is an error.
    pub fn list_issues(&self, series_id: SeriesId) -> Result<Vec<Issue>> {
        let conn = self.conn()?;
        if series::get_series(&conn, series_id)?.is_none() {
            return Err(Error::not_found("series", series_id));
        }
        issues::list_issues(&conn, series_id)
    }

    /// Any issue by id, including retired ones.
    pub fn get_issue(&self, id: IssueId) -> Result<Issue> {
        let conn = self.conn()?;
        issues::get_issue(&conn, id)?.ok_or_else(|| Error::not_found("issue", id))
    }

    /// The live issue indexed at `path`, if any.
    pub fn get_issue_by_path(&self, path: &Path) -> Result<Option<Issue>> {
        let conn = self.conn()?;
        issues::get_active_by_path(&conn, &path.to_string_lossy())
    }

    pub fn list_scan_runs(&self, limit: u32) -> Result<Vec<ScanRun>> {
        let conn = self.conn()?;
        scan_runs::list_scan_runs(&conn, limit)
    }
}

impl std::fmt::Debug for LibraryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryStore")
            .field("connections", &self.pool.state().connections)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::{DiscoveredComic, FileStat, IssueNumber, NormalizedMetadata, ScanMode, ScanStatus};
    use std::sync::Arc;

    fn changed(path: &str, series: &str) -> ScannedFile {
        ScannedFile::Changed(DiscoveredComic {
            path: PathBuf::from(path),
            stat: FileStat {
                size: 1,
                modified: Some(1),
            },
            content_id: ContentId::signature(1, 1),
            metadata: NormalizedMetadata {
                series: series.into(),
                series_key: series.to_lowercase(),
                sort_name: None,
                number: IssueNumber::new("1"),
                title: None,
                volume: None,
                year: None,
                summary: None,
                page_count: 1,
                cover_page: None,
            },
        })
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("shelf.db");
        let store = LibraryStore::open(&db).unwrap();
        assert!(db.exists());
        assert!(store.list_series().unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store = LibraryStore::open_in_memory().unwrap();
        assert!(store.get_issue(IssueId::new()).unwrap_err().is_not_found());
        assert!(store
            .list_issues(SeriesId::from_key("x"))
            .unwrap_err()
            .is_not_found());
        assert!(store
            .set_progress(IssueId::new(), 1, false)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn known_content_ids_are_scoped_to_root() {
        let store = LibraryStore::open_in_memory().unwrap();
        store
            .reconcile(
                &[changed("/a/x.cbz", "X"), changed("/b/y.cbz", "Y")],
                &RetireScope::Nothing,
            )
            .unwrap();
        let known = store.known_content_ids(Path::new("/a")).unwrap();
        assert_eq!(known.len(), 1);
        assert_eq!(
            known.get(Path::new("/a/x.cbz")),
            Some(&ContentId::signature(1, 1))
        );
    }

    #[test]
    fn prune_removes_series_and_retired_issues() {
        let store = LibraryStore::open_in_memory().unwrap();
        let summary = store
            .reconcile(&[changed("/a/x.cbz", "X")], &RetireScope::Nothing)
            .unwrap();
        let id = summary.added[0].issue_id;
        store.retire_outside(&[PathBuf::from("/elsewhere")]).unwrap();

        assert!(store.list_series().unwrap().is_empty());
        assert_eq!(store.prune_series().unwrap(), 1);
        assert!(store.get_issue(id).unwrap_err().is_not_found());
    }

    #[test]
    fn scan_runs_round_trip_through_store() {
        let store = LibraryStore::open_in_memory().unwrap();
        let mut run = ScanRun::start(&ScanMode::Full);
        store.insert_scan_run(&run).unwrap();
        run.finish(ScanStatus::Completed, None);
        store.finish_scan_run(&run).unwrap();

        let runs = store.list_scan_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, ScanStatus::Completed);
    }

    #[test]
    fn concurrent_writers_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LibraryStore::open(&dir.path().join("shelf.db")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let path = format!("/lib/{i}.cbz");
                    store
                        .reconcile(&[changed(&path, "Shared")], &RetireScope::Nothing)
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let series = store.list_series().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].issue_count, 4);
    }
}
