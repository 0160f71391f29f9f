//! cs-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for all other cs-* crates,
//! providing type-safe identifiers, a unified error type, comic-domain
//! types, application configuration, and a broadcast event bus.

pub mod comic;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod natural;

// Re-export the most commonly used items at the crate root.
pub use comic::*;
pub use error::{Error, Result};
pub use ids::*;
