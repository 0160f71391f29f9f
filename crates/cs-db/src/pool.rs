//! r2d2 pool over SQLite.
//!
//! File databases run in WAL mode, so the scanner's reconcile transaction
//! never blocks readers on the other pooled connections. Migrations run once
//! when a pool is built.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use cs_core::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const MAX_CONNECTIONS: u32 = 4;

const FILE_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;";

/// Open (or create) the database at `db_path` and bring its schema up to date.
pub fn init_pool(db_path: &Path) -> Result<DbPool> {
    let manager =
        SqliteConnectionManager::file(db_path).with_init(|conn| conn.execute_batch(FILE_PRAGMAS));
    build_migrated(manager, "file")
}

/// A private in-memory database.
///
/// Every call gets its own shared-cache name: connections of one pool see
/// the same data, separate pools never do.
pub fn init_memory_pool() -> Result<DbPool> {
    static NEXT_DB: AtomicU64 = AtomicU64::new(0);
    let uri = format!(
        "file:comicshelf_mem_{}?mode=memory&cache=shared",
        NEXT_DB.fetch_add(1, Ordering::Relaxed)
    );
    let manager = SqliteConnectionManager::file(uri)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    build_migrated(manager, "in-memory")
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("no pooled connection available: {e}")))
}

fn build_migrated(manager: SqliteConnectionManager, kind: &str) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .build(manager)
        .map_err(|e| Error::database(format!("cannot build {kind} pool: {e}")))?;
    let conn = get_conn(&pool)?;
    migrations::run_migrations(&conn)?;
    drop(conn);
    tracing::debug!(kind, max_connections = MAX_CONNECTIONS, "Database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pragma<T: rusqlite::types::FromSql>(pool: &DbPool, name: &str) -> T {
        get_conn(pool)
            .unwrap()
            .query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn memory_pool_enforces_foreign_keys() {
        let pool = init_memory_pool().unwrap();
        assert_eq!(pool.max_size(), MAX_CONNECTIONS);
        assert_eq!(pragma::<i32>(&pool, "foreign_keys"), 1);
    }

    #[test]
    fn file_pool_is_wal_and_reopenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");
        let pool = init_pool(&path).unwrap();
        assert_eq!(pragma::<String>(&pool, "journal_mode").to_lowercase(), "wal");
        drop(pool);

        // Second open finds the schema already applied.
        let pool = init_pool(&path).unwrap();
        assert_eq!(pragma::<i32>(&pool, "foreign_keys"), 1);
    }

    #[test]
    fn memory_pools_do_not_share_data() {
        let a = init_memory_pool().unwrap();
        let b = init_memory_pool().unwrap();
        get_conn(&a)
            .unwrap()
            .execute_batch(
                "INSERT INTO series (id, canonical_key, name, created_at, updated_at)
                 VALUES ('x', 'k', 'K', 'now', 'now')",
            )
            .unwrap();
        let count: i64 = get_conn(&b)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM series", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
