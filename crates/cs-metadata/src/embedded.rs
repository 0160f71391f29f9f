//! Metadata from the archive's own `ComicInfo.xml`.

use crate::normalize::clean_text;
use crate::strategy::ResolveStrategy;
use crate::types::{PartialMetadata, ResolveInput};

#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedStrategy;

impl ResolveStrategy for EmbeddedStrategy {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn resolve(&self, input: &ResolveInput<'_>) -> PartialMetadata {
        let Some(meta) = input.embedded else {
            return PartialMetadata::default();
        };
        PartialMetadata {
            series: meta.series.as_deref().and_then(clean_text),
            number: meta.number.as_deref().and_then(clean_text),
            title: meta.title.as_deref().and_then(clean_text),
            volume: meta.volume,
            year: meta.year,
            summary: meta.summary.as_deref().and_then(|s| {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }),
            page_count: meta.page_count.filter(|&n| n > 0),
            cover_page: meta.cover_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::EmbeddedMetadata;
    use std::path::Path;

    #[test]
    fn blank_fields_are_dropped() {
        let meta = EmbeddedMetadata {
            series: Some("  ".into()),
            number: Some(" 7 ".into()),
            summary: Some("\n".into()),
            page_count: Some(0),
            ..Default::default()
        };
        let input = ResolveInput::new(Path::new("/c/x.cbz")).with_embedded(Some(&meta));
        let got = EmbeddedStrategy.resolve(&input);
        assert_eq!(got.series, None);
        assert_eq!(got.number.as_deref(), Some("7"));
        assert_eq!(got.summary, None);
        assert_eq!(got.page_count, None);
    }

    #[test]
    fn no_document_is_empty() {
        let input = ResolveInput::new(Path::new("/c/x.cbz"));
        assert!(EmbeddedStrategy.resolve(&input).is_empty());
    }
}
