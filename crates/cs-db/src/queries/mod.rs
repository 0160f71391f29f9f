//! Database query modules.

pub mod issues;
pub mod scan_runs;
pub mod series;
