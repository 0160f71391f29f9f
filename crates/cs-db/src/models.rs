//! Row types for the series, issues and scan_runs tables.
//!
//! Column order in every `from_row` matches the `COLS` list of the
//! corresponding query module.

use chrono::{DateTime, Utc};
use cs_core::{
    IssueId, IssueNumber, ScanCounts, ScanRun, ScanRunId, ScanStatus, SeriesId,
};
use serde::Serialize;
use uuid::Uuid;

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_opt_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| {
        DateTime::parse_from_rfc3339(&v)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn count(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    Ok(n.max(0) as u64)
}

// ---- Series ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub id: SeriesId,
    pub canonical_key: String,
    pub name: String,
    pub sort_name: Option<String>,
    /// Number of non-retired issues.
    pub issue_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Series {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            canonical_key: row.get(1)?,
            name: row.get(2)?,
            sort_name: row.get(3)?,
            issue_count: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

// ---- Issue ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: IssueId,
    pub series_id: SeriesId,
    pub number: IssueNumber,
    pub title: Option<String>,
    pub volume: Option<i32>,
    pub year: Option<i32>,
    pub summary: Option<String>,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    /// Unix seconds.
    pub modified_at: Option<i64>,
    pub content_id: String,
    pub page_count: u32,
    pub cover_page: Option<u32>,
    pub current_page: u32,
    pub is_read: bool,
    pub retired: bool,
    pub retired_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Issue {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let number: String = row.get(2)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            series_id: parse_id(row, 1)?,
            number: IssueNumber::new(&number),
            title: row.get(3)?,
            volume: row.get(4)?,
            year: row.get(5)?,
            summary: row.get(6)?,
            file_path: row.get(7)?,
            file_name: row.get(8)?,
            file_size: row.get(9)?,
            modified_at: row.get(10)?,
            content_id: row.get(11)?,
            page_count: row.get(12)?,
            cover_page: row.get(13)?,
            current_page: row.get(14)?,
            is_read: row.get(15)?,
            retired: row.get(16)?,
            retired_at: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
        })
    }
}

// ---- ScanRun ----

/// Build a [`ScanRun`] from a `scan_runs` row.
pub fn scan_run_from_row(row: &rusqlite::Row) -> rusqlite::Result<ScanRun> {
    let id: ScanRunId = parse_id(row, 0)?;
    let status: String = row.get(2)?;
    let status = ScanStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown scan status '{status}'").into(),
        )
    })?;
    Ok(ScanRun {
        id,
        mode: row.get(1)?,
        status,
        started_at: parse_time(row, 3)?,
        finished_at: parse_opt_time(row, 4)?,
        counts: ScanCounts {
            discovered: count(row, 5)?,
            added: count(row, 6)?,
            updated: count(row, 7)?,
            unchanged: count(row, 8)?,
            retired: count(row, 9)?,
            failed: count(row, 10)?,
            conflicts: count(row, 11)?,
        },
        error: row.get(12)?,
    })
}
