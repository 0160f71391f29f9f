//! Scan run history queries.

use cs_core::{Error, Result, ScanRun, ScanRunId};
use rusqlite::Connection;

use crate::models::scan_run_from_row;

const COLS: &str = "id, mode, status, started_at, finished_at, discovered, added, updated, \
    unchanged, retired, failed, conflicts, error";

/// Record a newly started run.
pub fn insert_scan_run(conn: &Connection, run: &ScanRun) -> Result<()> {
    conn.execute(
        "INSERT INTO scan_runs (id, mode, status, started_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            run.id.to_string(),
            run.mode,
            run.status.as_str(),
            run.started_at.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Persist status, counters and finish time of a run.
pub fn update_scan_run(conn: &Connection, run: &ScanRun) -> Result<()> {
    let c = &run.counts;
    let n = conn
        .execute(
            "UPDATE scan_runs SET
                 status = ?2, finished_at = ?3, discovered = ?4, added = ?5, updated = ?6,
                 unchanged = ?7, retired = ?8, failed = ?9, conflicts = ?10, error = ?11
             WHERE id = ?1",
            rusqlite::params![
                run.id.to_string(),
                run.status.as_str(),
                run.finished_at.map(|t| t.to_rfc3339()),
                c.discovered as i64,
                c.added as i64,
                c.updated as i64,
                c.unchanged as i64,
                c.retired as i64,
                c.failed as i64,
                c.conflicts as i64,
                run.error,
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("scan_run", run.id));
    }
    Ok(())
}

/// Get a run by ID.
pub fn get_scan_run(conn: &Connection, id: ScanRunId) -> Result<Option<ScanRun>> {
    let q = format!("SELECT {COLS} FROM scan_runs WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], scan_run_from_row) {
        Ok(r) => Ok(Some(r)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Most recent runs first.
pub fn list_scan_runs(conn: &Connection, limit: u32) -> Result<Vec<ScanRun>> {
    let q = format!("SELECT {COLS} FROM scan_runs ORDER BY started_at DESC LIMIT ?1");
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([limit], scan_run_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}
