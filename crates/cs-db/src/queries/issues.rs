//! Issue queries.

use chrono::Utc;
use cs_core::{DiscoveredComic, Error, IssueId, Result, SeriesId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::Issue;

const COLS: &str = "id, series_id, number, title, volume, year, summary, file_path, file_name, \
    file_size, modified_at, content_id, page_count, cover_page, current_page, is_read, \
    retired, retired_at, created_at, updated_at";

/// Insert a new live issue for a discovered archive.
pub fn insert_issue(
    conn: &Connection,
    id: IssueId,
    series_id: SeriesId,
    comic: &DiscoveredComic,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let meta = &comic.metadata;
    conn.execute(
        "INSERT INTO issues (id, series_id, number, number_value, number_suffix, title, volume,
                             year, summary, file_path, file_name, file_size, modified_at,
                             content_id, page_count, cover_page, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
        rusqlite::params![
            id.to_string(),
            series_id.to_string(),
            meta.number.as_str(),
            meta.number.numeric_value(),
            meta.number.suffix(),
            meta.title,
            meta.volume,
            meta.year,
            meta.summary,
            comic.path.to_string_lossy().into_owned(),
            comic.file_name(),
            comic.stat.size as i64,
            comic.stat.modified,
            comic.content_id.as_str(),
            meta.page_count,
            meta.cover_page,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Replace the content-derived fields of an existing issue.
///
/// Identity and reading progress survive; the page marker is clamped to the
/// new page count.
pub fn update_issue_content(
    conn: &Connection,
    id: IssueId,
    series_id: SeriesId,
    comic: &DiscoveredComic,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let meta = &comic.metadata;
    let n = conn
        .execute(
            "UPDATE issues SET
                 series_id = ?2, number = ?3, number_value = ?4, number_suffix = ?5,
                 title = ?6, volume = ?7, year = ?8, summary = ?9, file_name = ?10,
                 file_size = ?11, modified_at = ?12, content_id = ?13, page_count = ?14,
                 cover_page = ?15,
                 current_page = MIN(current_page, MAX(?14 - 1, 0)),
                 updated_at = ?16
             WHERE id = ?1",
            rusqlite::params![
                id.to_string(),
                series_id.to_string(),
                meta.number.as_str(),
                meta.number.numeric_value(),
                meta.number.suffix(),
                meta.title,
                meta.volume,
                meta.year,
                meta.summary,
                comic.file_name(),
                comic.stat.size as i64,
                comic.stat.modified,
                comic.content_id.as_str(),
                meta.page_count,
                meta.cover_page,
                now,
            ],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("issue", id));
    }
    Ok(())
}

/// Get an issue by ID, retired or not.
pub fn get_issue(conn: &Connection, id: IssueId) -> Result<Option<Issue>> {
    let q = format!("SELECT {COLS} FROM issues WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], Issue::from_row) {
        Ok(i) => Ok(Some(i)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// The live issue at a path, if any.
pub fn get_active_by_path(conn: &Connection, path: &str) -> Result<Option<Issue>> {
    let q = format!("SELECT {COLS} FROM issues WHERE file_path = ?1 AND retired = 0");
    conn.query_row(&q, [path], Issue::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Live issues of a series in reading order.
pub fn list_issues(conn: &Connection, series_id: SeriesId) -> Result<Vec<Issue>> {
    let q = format!(
        "SELECT {COLS} FROM issues
         WHERE series_id = ?1 AND retired = 0
         ORDER BY number_value IS NULL, number_value, number_suffix, number, file_name"
    );
    let mut stmt = conn
        .prepare(&q)
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([series_id.to_string()], Issue::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// `(id, path, content_id)` of every live issue.
pub fn list_active_files(conn: &Connection) -> Result<Vec<(IssueId, String, String)>> {
    let mut stmt = conn
        .prepare("SELECT id, file_path, content_id FROM issues WHERE retired = 0")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            Ok((id, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    rows.into_iter()
        .map(|(id, path, content_id)| {
            let id = id
                .parse::<IssueId>()
                .map_err(|e| Error::database(format!("bad issue id '{id}': {e}")))?;
            Ok((id, path, content_id))
        })
        .collect()
}

/// Mark an issue retired. Returns `false` if it was already retired or
/// does not exist.
pub fn retire_issue(conn: &Connection, id: IssueId) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE issues SET retired = 1, retired_at = ?2, updated_at = ?2
             WHERE id = ?1 AND retired = 0",
            rusqlite::params![id.to_string(), now],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Record reading progress. Returns `false` when the issue is unknown.
pub fn set_progress(conn: &Connection, id: IssueId, current_page: u32, is_read: bool) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE issues SET current_page = ?2, is_read = ?3, updated_at = ?4 WHERE id = ?1",
            rusqlite::params![id.to_string(), current_page, is_read, now],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Permanently delete retired issue rows.
pub fn purge_retired(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM issues WHERE retired = 1", [])
        .map_err(|e| Error::database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::series::ensure_series;
    use cs_core::{ContentId, FileStat, IssueNumber, NormalizedMetadata};
    use std::path::PathBuf;

    fn comic(path: &str, number: &str, pages: u32) -> DiscoveredComic {
        DiscoveredComic {
            path: PathBuf::from(path),
            stat: FileStat {
                size: 100,
                modified: Some(1_700_000_000),
            },
            content_id: ContentId::signature(100, 1_700_000_000),
            metadata: NormalizedMetadata {
                series: "Saga".into(),
                series_key: "saga".into(),
                sort_name: None,
                number: IssueNumber::new(number),
                title: None,
                volume: None,
                year: Some(2012),
                summary: None,
                page_count: pages,
                cover_page: None,
            },
        }
    }

    fn setup() -> (crate::pool::DbPool, SeriesId) {
        let pool = init_memory_pool().unwrap();
        let sid = SeriesId::from_key("saga");
        ensure_series(&pool.get().unwrap(), sid, "saga", "Saga", None).unwrap();
        (pool, sid)
    }

    #[test]
    fn insert_and_fetch() {
        let (pool, sid) = setup();
        let conn = pool.get().unwrap();
        let id = IssueId::new();
        insert_issue(&conn, id, sid, &comic("/lib/Saga/Saga 001.cbz", "001", 22)).unwrap();

        let issue = get_issue(&conn, id).unwrap().unwrap();
        assert_eq!(issue.series_id, sid);
        assert_eq!(issue.number.as_str(), "001");
        assert_eq!(issue.file_name, "Saga 001.cbz");
        assert_eq!(issue.page_count, 22);
        assert_eq!(issue.year, Some(2012));

        let by_path = get_active_by_path(&conn, "/lib/Saga/Saga 001.cbz").unwrap();
        assert_eq!(by_path.map(|i| i.id), Some(id));
    }

    #[test]
    fn list_is_in_reading_order() {
        let (pool, sid) = setup();
        let conn = pool.get().unwrap();
        for (path, n) in [
            ("/lib/a.cbz", "10"),
            ("/lib/b.cbz", "Annual"),
            ("/lib/c.cbz", "2"),
            ("/lib/d.cbz", "1.5"),
            ("/lib/e.cbz", "2a"),
        ] {
            insert_issue(&conn, IssueId::new(), sid, &comic(path, n, 1)).unwrap();
        }
        let numbers: Vec<String> = list_issues(&conn, sid)
            .unwrap()
            .into_iter()
            .map(|i| i.number.to_string())
            .collect();
        assert_eq!(numbers, vec!["1.5", "2", "2a", "10", "Annual"]);
    }

    #[test]
    fn update_keeps_progress_and_clamps_page() {
        let (pool, sid) = setup();
        let conn = pool.get().unwrap();
        let id = IssueId::new();
        insert_issue(&conn, id, sid, &comic("/lib/a.cbz", "1", 20)).unwrap();
        assert!(set_progress(&conn, id, 15, true).unwrap());

        let mut changed = comic("/lib/a.cbz", "1", 10);
        changed.content_id = ContentId::signature(200, 1_700_000_100);
        update_issue_content(&conn, id, sid, &changed).unwrap();

        let issue = get_issue(&conn, id).unwrap().unwrap();
        assert_eq!(issue.page_count, 10);
        assert_eq!(issue.current_page, 9);
        assert!(issue.is_read);
        assert_eq!(issue.content_id, "sig:200:1700000100");
    }

    #[test]
    fn update_missing_issue_is_not_found() {
        let (pool, sid) = setup();
        let conn = pool.get().unwrap();
        let err = update_issue_content(&conn, IssueId::new(), sid, &comic("/x.cbz", "1", 1))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn retire_hides_and_purge_deletes() {
        let (pool, sid) = setup();
        let conn = pool.get().unwrap();
        let id = IssueId::new();
        insert_issue(&conn, id, sid, &comic("/lib/a.cbz", "1", 1)).unwrap();

        assert!(retire_issue(&conn, id).unwrap());
        assert!(!retire_issue(&conn, id).unwrap());
        assert!(get_active_by_path(&conn, "/lib/a.cbz").unwrap().is_none());
        assert!(list_issues(&conn, sid).unwrap().is_empty());
        assert!(list_active_files(&conn).unwrap().is_empty());

        let retired = get_issue(&conn, id).unwrap().unwrap();
        assert!(retired.retired);
        assert!(retired.retired_at.is_some());

        assert_eq!(purge_retired(&conn).unwrap(), 1);
        assert!(get_issue(&conn, id).unwrap().is_none());
    }
}
