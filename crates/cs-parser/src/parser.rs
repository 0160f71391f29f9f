//! Heuristics that turn a token stream into series / issue fields.
//!
//! The parser works in three phases:
//! 1. Tokenize and locate the descriptive region: everything after leading
//!    tags and before the first trailing tag.
//! 2. Find the volume marker and the issue number inside that region.
//! 3. Slice the series name and story title out of the original input
//!    around those anchors.

use crate::tokenizer::{tokenize, SpannedToken, Token};
use crate::types::{ParsedDirectory, ParsedFilename};

/// A volume found in the token stream. `start` is the index of the first
/// token of the marker, `end` the index of its last token.
struct VolumeMatch {
    start: usize,
    end: usize,
    value: i32,
}

/// Parse an archive file stem (no extension) into a [`ParsedFilename`].
pub fn parse(input: &str) -> ParsedFilename {
    let tokens = tokenize(input);
    let mut parsed = ParsedFilename {
        year: extract_year(&tokens),
        ..Default::default()
    };

    let Some(first) = first_significant(&tokens) else {
        return parsed;
    };
    let boundary = tokens[first..]
        .iter()
        .position(|t| t.token.is_tag())
        .map(|i| i + first)
        .unwrap_or(tokens.len());

    let volume = find_volume(&tokens, first, boundary);
    let number = find_number(&tokens, first, boundary, volume.as_ref());

    if number.is_none() && volume.is_none() {
        return parsed;
    }

    parsed.volume = volume.as_ref().map(|v| v.value);
    parsed.number = number.and_then(|i| number_text(&tokens[i].token));

    // Series: from the end of any leading tags up to the first anchor.
    let series_start = leading_tags_end(&tokens, first);
    let mut series_end = input.len();
    if let Some(i) = number {
        series_end = series_end.min(tokens[i].span.start);
    }
    if let Some(v) = &volume {
        series_end = series_end.min(tokens[v.start].span.start);
    }
    if boundary < tokens.len() {
        series_end = series_end.min(tokens[boundary].span.start);
    }
    if series_start < series_end {
        parsed.series = non_empty(clean(&input[series_start..series_end]));
    }

    // Title: after the last anchor, up to the first trailing tag.
    let title_start = number
        .map(|i| tokens[i].span.end)
        .into_iter()
        .chain(volume.as_ref().map(|v| tokens[v.end].span.end))
        .max()
        .unwrap_or(input.len());
    let title_end = tokens
        .get(boundary)
        .map(|t| t.span.start)
        .unwrap_or(input.len());
    if title_start < title_end {
        parsed.title = non_empty(clean(&input[title_start..title_end]));
    }

    parsed
}

/// Parse a directory name such as `Saga (2012)` into a series and year.
pub fn parse_directory(name: &str) -> ParsedDirectory {
    let tokens = tokenize(name);
    let year = extract_year(&tokens);

    let series = match first_significant(&tokens) {
        Some(first) => {
            let start = leading_tags_end(&tokens, first);
            let end = tokens[first..]
                .iter()
                .find(|t| t.token.is_tag())
                .map(|t| t.span.start)
                .unwrap_or(name.len());
            non_empty(clean(&name[start..end]))
        }
        // Nothing the lexer understands (e.g. a non-Latin title): keep the
        // name as-is.
        None if tokens.is_empty() => non_empty(clean(name)),
        None => None,
    };

    ParsedDirectory { series, year }
}

// -------------------------------------------------------------------------
// Anchors
// -------------------------------------------------------------------------

/// Index of the first token that is neither a tag nor a separator.
fn first_significant(tokens: &[SpannedToken<'_>]) -> Option<usize> {
    tokens
        .iter()
        .position(|t| !t.token.is_tag() && !t.token.is_separator())
}

/// Byte offset just past the tags that precede `first`.
fn leading_tags_end(tokens: &[SpannedToken<'_>], first: usize) -> usize {
    tokens[..first]
        .iter()
        .rev()
        .find(|t| t.token.is_tag())
        .map(|t| t.span.end)
        .unwrap_or(0)
}

fn extract_year(tokens: &[SpannedToken<'_>]) -> Option<i32> {
    tokens.iter().find_map(|t| match t.token {
        Token::YearParen(text) => text
            .trim_start_matches('(')
            .trim_end_matches(')')
            .parse()
            .ok(),
        _ => None,
    })
}

/// `v2`, `Vol.3`, or a `Vol`/`Volume` word followed by a bare number.
fn find_volume(tokens: &[SpannedToken<'_>], first: usize, boundary: usize) -> Option<VolumeMatch> {
    for i in first..boundary {
        match tokens[i].token {
            Token::Volume(text) => {
                if let Some(value) = leading_int(text.trim_start_matches(|c: char| !c.is_ascii_digit())) {
                    return Some(VolumeMatch {
                        start: i,
                        end: i,
                        value,
                    });
                }
            }
            Token::Word(word)
                if word.eq_ignore_ascii_case("vol") || word.eq_ignore_ascii_case("volume") =>
            {
                let next = next_non_dot(tokens, i + 1, boundary);
                if let Some(j) = next {
                    if let Token::Number(num) = tokens[j].token {
                        if let Some(value) = leading_int(num) {
                            return Some(VolumeMatch {
                                start: i,
                                end: j,
                                value,
                            });
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Pick the issue number token.
///
/// An explicit `#N` always wins. Otherwise bare numbers inside the
/// descriptive region are candidates, excluding the very first significant
/// token (`100 Bullets 012`) and a number already consumed by a volume.
/// A candidate sitting right before a tag, a hyphen, or the end of the name
/// is preferred; among equals the last one wins.
fn find_number(
    tokens: &[SpannedToken<'_>],
    first: usize,
    boundary: usize,
    volume: Option<&VolumeMatch>,
) -> Option<usize> {
    if let Some(i) = tokens[first..]
        .iter()
        .position(|t| matches!(t.token, Token::HashNumber(_)))
    {
        return Some(i + first);
    }

    let consumed = volume.map(|v| v.end);
    let candidates: Vec<usize> = (first + 1..boundary)
        .filter(|&i| matches!(tokens[i].token, Token::Number(_)) && Some(i) != consumed)
        .collect();

    let anchored = candidates.iter().rev().find(|&&i| {
        match next_non_dot(tokens, i + 1, tokens.len()) {
            None => true,
            Some(j) => tokens[j].token.is_tag() || tokens[j].token == Token::Hyphen,
        }
    });

    anchored.or(candidates.last()).copied()
}

/// Next index in `from..end` that is not a dot or underscore.
fn next_non_dot(tokens: &[SpannedToken<'_>], from: usize, end: usize) -> Option<usize> {
    (from..end).find(|&i| !matches!(tokens[i].token, Token::Dot | Token::Underscore))
}

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

fn number_text(token: &Token<'_>) -> Option<String> {
    match token {
        Token::HashNumber(text) => Some(text.trim_start_matches('#').to_string()),
        Token::Number(text) => Some(text.to_string()),
        _ => None,
    }
}

/// Parse the leading digit run of `text`.
fn leading_int(text: &str) -> Option<i32> {
    let end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

/// Underscores and dots become spaces, whitespace collapses, and dangling
/// hyphens at either end are dropped.
fn clean(raw: &str) -> String {
    let spaced = raw.replace(['_', '.'], " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_and_year() {
        let r = parse("Astonishing 012 (2005)");
        assert_eq!(r.series.as_deref(), Some("Astonishing"));
        assert_eq!(r.number.as_deref(), Some("012"));
        assert_eq!(r.year, Some(2005));
        assert_eq!(r.title, None);
    }

    #[test]
    fn volume_and_hash_number() {
        let r = parse("Series Name v2 #12");
        assert_eq!(r.series.as_deref(), Some("Series Name"));
        assert_eq!(r.volume, Some(2));
        assert_eq!(r.number.as_deref(), Some("12"));
    }

    #[test]
    fn underscore_separated() {
        let r = parse("Series_Name_012");
        assert_eq!(r.series.as_deref(), Some("Series Name"));
        assert_eq!(r.number.as_deref(), Some("012"));
    }

    #[test]
    fn story_title_between_hyphens() {
        let r = parse("Series - 012 - Story Title (2004) (digital)");
        assert_eq!(r.series.as_deref(), Some("Series"));
        assert_eq!(r.number.as_deref(), Some("012"));
        assert_eq!(r.title.as_deref(), Some("Story Title"));
        assert_eq!(r.year, Some(2004));
    }

    #[test]
    fn hyphen_anchored_number_beats_later_numbers() {
        let r = parse("Series - 012 - Part 2 Begins");
        assert_eq!(r.number.as_deref(), Some("012"));
        assert_eq!(r.title.as_deref(), Some("Part 2 Begins"));
    }

    #[test]
    fn leading_number_is_part_of_series() {
        let r = parse("100 Bullets 012");
        assert_eq!(r.series.as_deref(), Some("100 Bullets"));
        assert_eq!(r.number.as_deref(), Some("012"));
    }

    #[test]
    fn lone_number_is_not_an_issue() {
        assert!(parse("2000").is_empty());
    }

    #[test]
    fn no_number_yields_nothing() {
        let r = parse("random scan");
        assert!(r.is_empty());
    }

    #[test]
    fn volume_without_number() {
        let r = parse("Saga v01 (2012)");
        assert_eq!(r.series.as_deref(), Some("Saga"));
        assert_eq!(r.volume, Some(1));
        assert_eq!(r.number, None);
        assert_eq!(r.year, Some(2012));
    }

    #[test]
    fn spelled_out_volume() {
        let r = parse("Batman Vol 3 001");
        assert_eq!(r.series.as_deref(), Some("Batman"));
        assert_eq!(r.volume, Some(3));
        assert_eq!(r.number.as_deref(), Some("001"));
    }

    #[test]
    fn leading_group_tag_is_skipped() {
        let r = parse("[Empire] Batman 001");
        assert_eq!(r.series.as_deref(), Some("Batman"));
        assert_eq!(r.number.as_deref(), Some("001"));
    }

    #[test]
    fn hyphenated_series_and_decimal_number() {
        let r = parse("X-Men 1.5");
        assert_eq!(r.series.as_deref(), Some("X-Men"));
        assert_eq!(r.number.as_deref(), Some("1.5"));
    }

    #[test]
    fn non_ascii_series_survives_slicing() {
        let r = parse("Pokémon Adventures 003");
        assert_eq!(r.series.as_deref(), Some("Pokémon Adventures"));
    }

    #[test]
    fn directory_with_year() {
        let d = parse_directory("Saga (2012)");
        assert_eq!(d.series.as_deref(), Some("Saga"));
        assert_eq!(d.year, Some(2012));
    }

    #[test]
    fn directory_without_year() {
        let d = parse_directory("Unsorted Comics");
        assert_eq!(d.series.as_deref(), Some("Unsorted Comics"));
        assert_eq!(d.year, None);
    }

    #[test]
    fn directory_with_underscores() {
        let d = parse_directory("Paper_Girls");
        assert_eq!(d.series.as_deref(), Some("Paper Girls"));
    }

    #[test]
    fn directory_outside_lexer_alphabet() {
        let d = parse_directory("ワンピース");
        assert_eq!(d.series.as_deref(), Some("ワンピース"));
    }
}
