//! Schema versions compiled into the binary.
//!
//! Each version runs once inside its own transaction; `schema_migrations`
//! records the ones already applied to a database file.

use cs_core::{Error, Result};
use rusqlite::Connection;

/// V1: series, issues and their ordering / uniqueness indexes.
const V1_INITIAL: &str = r#"
CREATE TABLE series (
    id            TEXT PRIMARY KEY,
    canonical_key TEXT UNIQUE NOT NULL,
    name          TEXT NOT NULL,
    sort_name     TEXT,
    issue_count   INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE issues (
    id            TEXT PRIMARY KEY,
    series_id     TEXT NOT NULL REFERENCES series(id) ON DELETE CASCADE,
    number        TEXT NOT NULL,
    number_value  REAL,
    number_suffix TEXT NOT NULL DEFAULT '',
    title         TEXT,
    volume        INTEGER,
    year          INTEGER,
    summary       TEXT,
    file_path     TEXT NOT NULL,
    file_name     TEXT NOT NULL,
    file_size     INTEGER NOT NULL,
    modified_at   INTEGER,
    content_id    TEXT NOT NULL,
    page_count    INTEGER NOT NULL DEFAULT 0,
    cover_page    INTEGER,
    current_page  INTEGER NOT NULL DEFAULT 0,
    is_read       INTEGER NOT NULL DEFAULT 0,
    retired       INTEGER NOT NULL DEFAULT 0,
    retired_at    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- One live issue per file; retired rows keep their path for history.
CREATE UNIQUE INDEX idx_issues_active_path ON issues(file_path) WHERE retired = 0;
CREATE INDEX idx_issues_series_order ON issues(series_id, number_value, number_suffix);
"#;

/// V2: scan run history.
const V2_SCAN_RUNS: &str = r#"
CREATE TABLE scan_runs (
    id          TEXT PRIMARY KEY,
    mode        TEXT NOT NULL,
    status      TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    discovered  INTEGER NOT NULL DEFAULT 0,
    added       INTEGER NOT NULL DEFAULT 0,
    updated     INTEGER NOT NULL DEFAULT 0,
    unchanged   INTEGER NOT NULL DEFAULT 0,
    retired     INTEGER NOT NULL DEFAULT 0,
    failed      INTEGER NOT NULL DEFAULT 0,
    conflicts   INTEGER NOT NULL DEFAULT 0,
    error       TEXT
);

CREATE INDEX idx_scan_runs_started ON scan_runs(started_at);
"#;

/// All migrations in order. Each entry is `(version, sql)`.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_SCAN_RUNS)];

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(version, "Applied migration");
    }

    Ok(())
}
