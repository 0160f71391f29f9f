//! Logos-based tokenizer for comic archive file stems and directory names.
//!
//! Names in the wild look like `Series Name 012 (2004) (digital)`,
//! `Series_Name_v2_#12` or `Series - 012 - Story Title [Group]`. The lexer
//! recognises the structural pieces (issue markers, volumes, parenthesised
//! years, tags) and leaves everything else as words.

use logos::Logos;

/// Token types emitted by the Logos lexer.
///
/// More specific patterns receive higher priorities so they win when two
/// regexes match the same span.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
pub enum Token<'src> {
    /// Parenthesised four-digit year: `(2004)`.
    #[regex(r"\((19|20)\d{2}\)", priority = 12)]
    YearParen(&'src str),

    /// Any other parenthesised tag: `(digital)`, `(of 6)`.
    #[regex(r"\([^)]*\)", priority = 3)]
    Paren(&'src str),

    /// Bracketed tag, usually a scan group: `[Empire]`.
    #[regex(r"\[[^\]]*\]", priority = 3)]
    Bracket(&'src str),

    /// Explicit issue marker: `#12`, `#1.5`, `#12AU`.
    #[regex(r"#\d+(\.\d+)?[a-zA-Z]*", priority = 10)]
    HashNumber(&'src str),

    /// Compact volume marker: `v2`, `V02`, `vol.3`, `Volume4`.
    #[regex(r"(?i)v(ol(ume)?)?\.?\d+", priority = 9)]
    Volume(&'src str),

    /// Bare number, with optional decimal and letter suffix: `012`, `1.5`, `12b`.
    #[regex(r"\d+(\.\d+)?[a-zA-Z]*", priority = 2)]
    Number(&'src str),

    #[token(".")]
    Dot,

    #[token("-")]
    Hyphen,

    #[token("_")]
    Underscore,

    /// Generic word token (lowest priority).
    #[regex(r"[a-zA-Z][a-zA-Z0-9']*", priority = 1)]
    Word(&'src str),
}

impl Token<'_> {
    /// Separators carry no meaning on their own.
    pub fn is_separator(&self) -> bool {
        matches!(self, Token::Dot | Token::Hyphen | Token::Underscore)
    }

    /// Parenthesised or bracketed tags end the descriptive part of a name.
    pub fn is_tag(&self) -> bool {
        matches!(
            self,
            Token::YearParen(_) | Token::Paren(_) | Token::Bracket(_)
        )
    }
}

/// A token together with the byte span it occupies in the original input.
#[derive(Debug, Clone)]
pub struct SpannedToken<'src> {
    pub token: Token<'src>,
    pub span: std::ops::Range<usize>,
}

/// Tokenize an input string into a `Vec` of spanned tokens.
///
/// Characters the lexer does not recognise (punctuation, non-ASCII letters)
/// are dropped from the token stream; callers slice the original input by
/// span when they need the exact text.
pub fn tokenize(input: &str) -> Vec<SpannedToken<'_>> {
    Token::lexer(input)
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| SpannedToken { token, span }))
        .collect()
}
