//! cs-db: database access and persistence layer.
//!
//! SQLite-backed storage with connection pooling, embedded migrations,
//! typed models, per-table query modules, and the transactional
//! reconciliation that applies a scan batch to the index.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod reconcile;
pub mod store;

pub use reconcile::{AddedIssue, ReconcileSummary, RetireScope};
pub use store::LibraryStore;
