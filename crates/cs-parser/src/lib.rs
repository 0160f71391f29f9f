//! cs-parser: filename parser for comic archives.
//!
//! Extracts series, issue number, volume, year and story title from archive
//! file stems such as `"Series Name 012 (2004)"`, and series / year from
//! directory names such as `"Saga (2012)"`.
//!
//! # Quick start
//!
//! ```
//! use cs_parser::parse;
//!
//! let r = parse("Series - 012 - Story Title (2004) (digital)");
//! assert_eq!(r.series.as_deref(), Some("Series"));
//! assert_eq!(r.number.as_deref(), Some("012"));
//! assert_eq!(r.title.as_deref(), Some("Story Title"));
//! assert_eq!(r.year, Some(2004));
//! ```

pub mod types;
pub mod tokenizer;
mod parser;

pub use types::{ParsedDirectory, ParsedFilename};

/// Parse an archive file stem (without extension).
///
/// Tokenizes the input with a Logos lexer, anchors on the issue number and
/// volume markers, then slices the series name and story title out of the
/// surrounding text.
///
/// # Examples
///
/// ```
/// let r = cs_parser::parse("Series Name v2 #12");
/// assert_eq!(r.series.as_deref(), Some("Series Name"));
/// assert_eq!(r.volume, Some(2));
/// assert_eq!(r.number.as_deref(), Some("12"));
/// ```
pub fn parse(stem: &str) -> ParsedFilename {
    parser::parse(stem)
}

/// Parse a directory name; a trailing `(YYYY)` becomes the year.
pub fn parse_directory(name: &str) -> ParsedDirectory {
    parser::parse_directory(name)
}
