// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Lexer for iCalendar content lines as defined in RFC 5545.
//!
//! Folded continuation lines are removed by the lexer itself, so downstream
//! stages see one logical line per property. Both `CRLF` and bare `LF` line
//! endings are accepted: calendar data embedded in XML frequently loses its
//! carriage returns on the way.

use std::fmt::{self, Display};

use chumsky::input::{Input, Stream, ValueInput};
use chumsky::span::SimpleSpan;
use chumsky::span::Span as _;
use logos::Logos;

/// Byte range of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the slice of `src` covered by this span.
    #[must_use]
    pub fn slice<'src>(&self, src: &'src str) -> &'src str {
        src.get(self.start..self.end).unwrap_or_default()
    }
}

impl From<SimpleSpan> for Span {
    fn from(span: SimpleSpan) -> Self {
        Self::new(span.start, span.end)
    }
}

impl From<Span> for SimpleSpan {
    fn from(span: Span) -> Self {
        SimpleSpan::new((), span.start..span.end)
    }
}

/// Token stream over iCalendar source, ready for the parsers in
/// [`crate::scanner`]. Spans are byte offsets into `src`.
pub fn lex_analysis(src: &str) -> impl ValueInput<'_, Token = Token<'_>, Span = SimpleSpan> {
    let eoi = SimpleSpan::new((), src.len()..src.len());
    Stream::from_iter(tokenize(src)).map(eoi, |t: SpannedToken<'_>| (t.token, SimpleSpan::from(t.span)))
}

/// Tokenize iCalendar source into spanned tokens.
///
/// Lexing never fails: bytes the lexer does not recognise become
/// [`Token::Error`] so that the scanner can decide what to do with them.
pub fn tokenize(src: &str) -> impl Iterator<Item = SpannedToken<'_>> {
    Token::lexer(src).spanned().map(|(tok, span)| SpannedToken {
        token: tok.unwrap_or(Token::Error),
        span: Span::new(span.start, span.end),
    })
}

/// Token emitted by the iCalendar lexer
#[derive(PartialEq, Eq, Clone, Copy, Logos)]
#[logos(skip r"\r?\n[ \t]")] // skip folding
pub enum Token<'a> {
    /// Double Quote (")
    #[token("\"")]
    DQuote,

    /// Comma (,)
    #[token(",")]
    Comma,

    /// Colon (:)
    #[token(":")]
    Colon,

    /// Semicolon (;)
    #[token(";")]
    Semicolon,

    /// Equal sign (=)
    #[token("=")]
    Equal,

    /// ASCII symbols: sequences of printable ASCII characters
    #[regex(r#"[\t !#$%&'()*+./<>?@\[\\\]\^`\{|\}~]+"#)]
    Symbol(&'a str),

    /// Line break, with or without carriage return
    #[regex(r"\r?\n")]
    Newline,

    /// ASCII word characters: 0-9, A-Z, a-z, underscore, hyphen
    #[regex("[0-9A-Za-z_-]+")]
    Word(&'a str),

    /// Runs of non-ASCII characters
    #[regex(r"[^\x00-\x7F]+")]
    UnicodeText(&'a str),

    /// Anything else, typically stray control characters
    Error,
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DQuote => write!(f, "DQuote"),
            Self::Comma => write!(f, "Comma"),
            Self::Colon => write!(f, "Colon"),
            Self::Semicolon => write!(f, "Semicolon"),
            Self::Equal => write!(f, "Equal"),
            Self::Symbol(s) => write!(f, "Symbol({s})"),
            Self::Newline => write!(f, "Newline"),
            Self::Word(s) => write!(f, "Word({s})"),
            Self::UnicodeText(s) => write!(f, "UnicodeText({s})"),
            Self::Error => write!(f, "Error"),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A token with its associated span in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpannedToken<'src> {
    /// The token
    pub token: Token<'src>,
    /// Where the token was found
    pub span: Span,
}
