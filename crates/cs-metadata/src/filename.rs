//! Metadata parsed from the archive's file name.

use crate::strategy::ResolveStrategy;
use crate::types::{PartialMetadata, ResolveInput};

#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameStrategy;

impl ResolveStrategy for FilenameStrategy {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn resolve(&self, input: &ResolveInput<'_>) -> PartialMetadata {
        let Some(stem) = input.path.file_stem().map(|s| s.to_string_lossy()) else {
            return PartialMetadata::default();
        };
        let parsed = cs_parser::parse(&stem);
        PartialMetadata {
            series: parsed.series,
            number: parsed.number,
            title: parsed.title,
            volume: parsed.volume,
            year: parsed.year,
            ..Default::default()
        }
    }
}
