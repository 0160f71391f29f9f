//! The [`ResolveStrategy`] trait.

use crate::types::{PartialMetadata, ResolveInput};

/// One source of descriptive metadata.
///
/// Strategies are pure: no I/O, no failure. A strategy that finds nothing
/// returns an empty [`PartialMetadata`].
pub trait ResolveStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn resolve(&self, input: &ResolveInput<'_>) -> PartialMetadata;
}
