//! Fallback metadata from the containing directory.
//!
//! The parent directory name becomes the series (a trailing `(YYYY)` is the
//! year) and the archive's position among its siblings stands in for the
//! issue number.

use crate::strategy::ResolveStrategy;
use crate::types::{PartialMetadata, ResolveInput};

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryStrategy;

impl ResolveStrategy for DirectoryStrategy {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn resolve(&self, input: &ResolveInput<'_>) -> PartialMetadata {
        let parsed = input
            .path
            .parent()
            .and_then(|p| p.file_name())
            .map(|name| cs_parser::parse_directory(&name.to_string_lossy()))
            .unwrap_or_default();
        PartialMetadata {
            series: parsed.series,
            year: parsed.year,
            number: input.ordinal.map(|n| n.to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parent_name_and_ordinal() {
        let input = ResolveInput::new(Path::new("/lib/Unsorted Comics/scan.cbz")).with_ordinal(3);
        let got = DirectoryStrategy.resolve(&input);
        assert_eq!(got.series.as_deref(), Some("Unsorted Comics"));
        assert_eq!(got.number.as_deref(), Some("3"));
    }

    #[test]
    fn year_in_directory_name() {
        let input = ResolveInput::new(Path::new("/lib/Saga (2012)/x.cbz"));
        let got = DirectoryStrategy.resolve(&input);
        assert_eq!(got.series.as_deref(), Some("Saga"));
        assert_eq!(got.year, Some(2012));
        assert_eq!(got.number, None);
    }

    #[test]
    fn bare_file_name_has_no_parent() {
        let got = DirectoryStrategy.resolve(&ResolveInput::new(Path::new("x.cbz")));
        assert_eq!(got.series, None);
    }
}
