//! Series queries.

use chrono::Utc;
use cs_core::{Error, Result, SeriesId};
use rusqlite::Connection;

use crate::models::Series;

const COLS: &str = "id, canonical_key, name, sort_name, issue_count, created_at, updated_at";

/// Insert the series if its id is new. Returns `true` when a row was created.
///
/// An existing series keeps its first display name.
pub fn ensure_series(
    conn: &Connection,
    id: SeriesId,
    canonical_key: &str,
    name: &str,
    sort_name: Option<&str>,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "INSERT INTO series (id, canonical_key, name, sort_name, issue_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
             ON CONFLICT(id) DO NOTHING",
            rusqlite::params![id.to_string(), canonical_key, name, sort_name, now],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Get a series by ID.
pub fn get_series(conn: &Connection, id: SeriesId) -> Result<Option<Series>> {
    let q = format!("SELECT {COLS} FROM series WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], Series::from_row) {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List series that have at least one live issue, in sort-name order.
pub fn list_series(conn: &Connection) -> Result<Vec<Series>> {
    let q = format!(
        "SELECT {COLS} FROM series
         WHERE issue_count > 0
         ORDER BY COALESCE(sort_name, name) COLLATE NOCASE, name"
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Series::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Recompute `issue_count` for every series whose stored count is stale.
pub fn refresh_issue_counts(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE series
         SET issue_count = (SELECT COUNT(*) FROM issues i WHERE i.series_id = series.id AND i.retired = 0),
             updated_at = ?1
         WHERE issue_count != (SELECT COUNT(*) FROM issues i WHERE i.series_id = series.id AND i.retired = 0)",
        [now],
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete series with no live issues. Their retired issues cascade.
pub fn delete_empty_series(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM series
         WHERE NOT EXISTS (SELECT 1 FROM issues i WHERE i.series_id = series.id AND i.retired = 0)",
        [],
    )
    .map_err(|e| Error::database(e.to_string()))
}
