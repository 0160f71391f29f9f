//! Output types for the filename parser.

use serde::{Deserialize, Serialize};

/// Fields recovered from an archive's file stem.
///
/// Every field is optional. `series` is only reported when the name also
/// carried an issue number or a volume; a bare title is too ambiguous to
/// claim a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFilename {
    /// Series name with separators normalized to single spaces.
    pub series: Option<String>,
    /// Issue number as written, without a leading `#`.
    pub number: Option<String>,
    pub volume: Option<i32>,
    /// Year from a parenthesised `(YYYY)` tag.
    pub year: Option<i32>,
    /// Story title following the issue number (`Series - 012 - Title`).
    pub title: Option<String>,
}

impl ParsedFilename {
    /// True when the parser recovered nothing at all.
    pub fn is_empty(&self) -> bool {
        self.series.is_none()
            && self.number.is_none()
            && self.volume.is_none()
            && self.year.is_none()
            && self.title.is_none()
    }
}

/// Fields recovered from a directory name such as `Saga (2012)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDirectory {
    pub series: Option<String>,
    pub year: Option<i32>,
}
