//! Resolver input and per-strategy output.

use std::path::Path;

use cs_core::EmbeddedMetadata;
use serde::{Deserialize, Serialize};

/// Everything a strategy may look at for one archive.
#[derive(Debug, Clone, Copy)]
pub struct ResolveInput<'a> {
    pub path: &'a Path,
    /// Parsed `ComicInfo.xml`, if the archive carried one.
    pub embedded: Option<&'a EmbeddedMetadata>,
    /// 1-based position among sibling archives in natural order.
    pub ordinal: Option<u32>,
    /// Page count from the archive listing; `None` when it could not be read.
    pub page_count: Option<u32>,
}

impl<'a> ResolveInput<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self {
            path,
            embedded: None,
            ordinal: None,
            page_count: None,
        }
    }

    pub fn with_embedded(mut self, embedded: Option<&'a EmbeddedMetadata>) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = Some(page_count);
        self
    }
}

/// Fields one strategy managed to recover. Empty strings never appear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMetadata {
    pub series: Option<String>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub volume: Option<i32>,
    pub year: Option<i32>,
    pub summary: Option<String>,
    pub page_count: Option<u32>,
    pub cover_page: Option<u32>,
}

impl PartialMetadata {
    /// Fill every field still missing here from `other`.
    pub fn fill_from(&mut self, other: PartialMetadata) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.series, other.series);
        fill(&mut self.number, other.number);
        fill(&mut self.title, other.title);
        fill(&mut self.volume, other.volume);
        fill(&mut self.year, other.year);
        fill(&mut self.summary, other.summary);
        fill(&mut self.page_count, other.page_count);
        fill(&mut self.cover_page, other.cover_page);
    }

    pub fn is_empty(&self) -> bool {
        *self == PartialMetadata::default()
    }
}
