//! cs-library: scanner orchestration and the read-side service.
//!
//! [`Library`] wires the pieces together the way the binary (or a web layer)
//! needs them: one [`LibraryStore`], one [`EventBus`], one [`Scanner`] owning
//! the [`ScanLock`], and a [`LibraryService`] for reads.

pub mod discovery;
pub mod lock;
pub mod scanner;
pub mod service;

pub use lock::{ScanGuard, ScanLock};
pub use scanner::{RescanOutcome, ScanState, Scanner};
pub use service::{LibraryService, PageData};

use std::sync::Arc;

use cs_archive::ThumbnailOptions;
use cs_core::config::Config;
use cs_core::events::EventBus;
use cs_core::{Result, ScanMode, ScanRun};
use cs_db::LibraryStore;
use tokio::task::JoinHandle;

/// Shared handles for one library.
#[derive(Debug, Clone)]
pub struct Library {
    config: Arc<Config>,
    store: Arc<LibraryStore>,
    events: Arc<EventBus>,
    scanner: Scanner,
    service: LibraryService,
}

impl Library {
    /// Open the database under `storage.data_dir` and clear any stale scan
    /// marker left by a crashed process.
    pub fn open(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.data_dir)?;
        let db_path = config.storage.db_path();
        tracing::info!(path = %db_path.display(), "Opening library database");
        let store = LibraryStore::open(&db_path)?;
        Ok(Self::with_store(config, store))
    }

    /// Build around an existing store (tests use an in-memory one).
    pub fn with_store(config: Config, store: LibraryStore) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let events = Arc::new(EventBus::default());

        let lock = Arc::new(ScanLock::new(config.storage.lock_path()));
        lock.recover_stale();

        let scanner = Scanner::new(
            Arc::clone(&config),
            Arc::clone(&store),
            Arc::clone(&events),
            lock,
        );
        let service = LibraryService::new(
            Arc::clone(&store),
            ThumbnailOptions::from(config.thumbnails),
        );

        Self {
            config,
            store,
            events,
            scanner,
            service,
        }
    }

    /// Kick off a background full scan when `scan.on_startup` is set.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_up(&self) -> Result<Option<JoinHandle<ScanRun>>> {
        if !self.config.scan.on_startup {
            return Ok(None);
        }
        tracing::info!("Running startup scan");
        self.scanner.trigger(ScanMode::Full)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<LibraryStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn service(&self) -> &LibraryService {
        &self.service
    }
}
