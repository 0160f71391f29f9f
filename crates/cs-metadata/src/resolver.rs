//! Ordered, per-field merge of strategy outputs.

use cs_core::config::{MetadataConfig, MetadataPrecedence};
use cs_core::{IssueNumber, NormalizedMetadata};

use crate::directory::DirectoryStrategy;
use crate::embedded::EmbeddedStrategy;
use crate::filename::FilenameStrategy;
use crate::normalize::{clean_text, series_key, sort_name};
use crate::strategy::ResolveStrategy;
use crate::types::{PartialMetadata, ResolveInput};

/// Series name used when no strategy produced one.
pub const UNKNOWN_SERIES: &str = "Unknown";

/// Runs strategies in order; for each field the first strategy that
/// produced a value wins.
pub struct Resolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl Resolver {
    pub fn new(strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the strategy chain described by the metadata config.
    pub fn from_config(config: &MetadataConfig) -> Self {
        let mut strategies: Vec<Box<dyn ResolveStrategy>> = Vec::with_capacity(3);
        match config.precedence {
            MetadataPrecedence::EmbeddedFirst => {
                if config.use_embedded {
                    strategies.push(Box::new(EmbeddedStrategy));
                }
                strategies.push(Box::new(FilenameStrategy));
            }
            MetadataPrecedence::FilenameFirst => {
                strategies.push(Box::new(FilenameStrategy));
                if config.use_embedded {
                    strategies.push(Box::new(EmbeddedStrategy));
                }
            }
        }
        if config.directory_fallback {
            strategies.push(Box::new(DirectoryStrategy));
        }
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Merge all strategies without normalizing.
    pub fn merge(&self, input: &ResolveInput<'_>) -> PartialMetadata {
        let mut merged = PartialMetadata::default();
        for strategy in &self.strategies {
            let partial = strategy.resolve(input);
            tracing::trace!(
                strategy = strategy.name(),
                path = %input.path.display(),
                ?partial,
                "Strategy result"
            );
            merged.fill_from(partial);
        }
        merged
    }

    /// Resolve one archive. Never fails: missing fields get placeholders.
    pub fn resolve(&self, input: &ResolveInput<'_>) -> NormalizedMetadata {
        let merged = self.merge(input);

        let series = merged
            .series
            .as_deref()
            .and_then(clean_text)
            .unwrap_or_else(|| UNKNOWN_SERIES.to_string());
        let number = IssueNumber::new(merged.number.as_deref().unwrap_or_default());

        // The listing is authoritative; the embedded count only fills in
        // when the archive could not be listed.
        let page_count = input.page_count.or(merged.page_count).unwrap_or(0);
        let cover_page = merged.cover_page.filter(|&c| c < page_count);

        NormalizedMetadata {
            series_key: series_key(&series),
            sort_name: sort_name(&series),
            series,
            number,
            title: merged.title,
            volume: merged.volume,
            year: merged.year,
            summary: merged.summary,
            page_count,
            cover_page,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::from_config(&MetadataConfig::default())
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
