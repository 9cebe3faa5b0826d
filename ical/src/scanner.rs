// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Parser that groups lexer tokens into content lines.
//!
//! A content line is `name *(";" param) ":" value`. Names are normalised to
//! upper case, parameter values are unquoted, and the property value is kept
//! verbatim (escapes are resolved later by the analysis stage, because only
//! it knows the value type).

use std::fmt::{self, Display};

use chumsky::container::Container;
use chumsky::extra::ParserExtra;
use chumsky::input::ValueInput;
use chumsky::prelude::*;

use crate::lexer::{Span, Token, lex_analysis};

/// A parsed content line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Property name, upper case
    pub name: String,
    /// Property parameters in source order
    pub params: Vec<Parameter>,
    /// Raw property value
    pub value: String,
    /// Span of the whole line
    pub span: Span,
}

impl ContentLine {
    /// Returns the first value of the named parameter, if present.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.values.first())
            .map(String::as_str)
    }
}

impl Display for ContentLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}

/// A parameter on a content line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name, upper case
    pub name: String,
    /// Parameter values with surrounding quotes removed
    pub values: Vec<String>,
}

/// Error for a content line that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed content line at {}..{}: {reason}", span.start, span.end)]
pub struct ContentLineError {
    /// Where parsing stopped
    pub span: Span,
    /// What was found and what was expected instead
    pub reason: String,
}

impl<'tokens, 'src> From<Rich<'tokens, Token<'src>>> for ContentLineError {
    fn from(err: Rich<'tokens, Token<'src>>) -> Self {
        Self {
            span: Span::from(*err.span()),
            reason: err.to_string(),
        }
    }
}

/// Result of scanning a document
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Lines that were parsed successfully
    pub lines: Vec<ContentLine>,
    /// Lines that were skipped
    pub errors: Vec<ContentLineError>,
}

/// Scan content lines from iCalendar source.
///
/// Scanning is tolerant: a malformed line is reported in
/// [`ScanResult::errors`] and skipped, and blank lines or leading whitespace
/// are ignored.
#[must_use]
pub fn scan_content_lines(src: &str) -> ScanResult {
    let (lines, errors) = content_lines::<'_, '_, _, extra::Err<Rich<'_, _>>>()
        .parse(lex_analysis(src))
        .into_output_errors();

    ScanResult {
        lines: lines
            .unwrap_or_default()
            .into_iter()
            .map(|raw| raw.build(src))
            .collect(),
        errors: errors.into_iter().map(ContentLineError::from).collect(),
    }
}

fn content_lines<'tokens, 'src: 'tokens, I, E>() -> impl Parser<'tokens, I, Vec<RawLine>, E>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
    E: ParserExtra<'tokens, I>,
{
    let blank = select! {
        Token::Newline => (),
        Token::Symbol(s) if s.trim().is_empty() => (),
    };

    // a malformed line is dropped up to its line break
    let skip_line = select! { t if t != Token::Newline => () }
        .repeated()
        .at_least(1)
        .then_ignore(just(Token::Newline).or_not())
        .to(None);

    let line = content_line()
        .map(Some)
        .recover_with(via_parser(skip_line));

    blank
        .clone()
        .repeated()
        .ignore_then(line)
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(blank.repeated())
        .map(|lines| lines.into_iter().flatten().collect())
}

#[derive(Clone)]
struct RawLine {
    name: SpanCollector,
    params: Vec<RawParameter>,
    value: SpanCollector,
    span: Span,
}

impl RawLine {
    fn build(self, src: &str) -> ContentLine {
        ContentLine {
            name: self.name.build(src).to_ascii_uppercase(),
            params: self.params.into_iter().map(|p| p.build(src)).collect(),
            value: self.value.build(src),
            span: self.span,
        }
    }
}

fn content_line<'tokens, 'src: 'tokens, I, E>() -> impl Parser<'tokens, I, RawLine, E> + Clone
where
    I: Input<'tokens, Token = Token<'src>, Span = SimpleSpan>,
    E: ParserExtra<'tokens, I>,
{
    let params = just(Token::Semicolon)
        .ignore_then(parameter())
        .repeated()
        .collect();

    identifier()
        .then(params)
        .then_ignore(just(Token::Colon))
        .then(value())
        .then_ignore(just(Token::Newline).or_not())
        .map_with(|((name, params), value), e| RawLine {
            name,
            params,
            value,
            span: Span::from(e.span()),
        })
}

#[derive(Clone)]
struct RawParameter {
    name: SpanCollector,
    values: Vec<SpanCollector>,
}

impl RawParameter {
    fn build(self, src: &str) -> Parameter {
        Parameter {
            name: self.name.build(src).to_ascii_uppercase(),
            values: self.values.into_iter().map(|v| v.build(src)).collect(),
        }
    }
}

fn parameter<'tokens, 'src: 'tokens, I, E>() -> impl Parser<'tokens, I, RawParameter, E> + Clone
where
    I: Input<'tokens, Token = Token<'src>, Span = SimpleSpan>,
    E: ParserExtra<'tokens, I>,
{
    let quoted_string = select! {
        (
            Token::Comma
            | Token::Colon
            | Token::Semicolon
            | Token::Equal
            | Token::Symbol(_)
            | Token::Word(_)
            | Token::UnicodeText(_)
            | Token::Error
        ) => (),
    }
    .map_with(|(), e| e.span())
    .repeated()
    .collect::<SpanCollector>()
    .delimited_by(just(Token::DQuote), just(Token::DQuote));

    // may be empty, as in `X-A=:value`
    let paramtext = select! {
        (
            Token::Equal
            | Token::Symbol(_)
            | Token::Word(_)
            | Token::UnicodeText(_)
            | Token::Error
        ) => (),
    }
    .map_with(|(), e| e.span())
    .repeated()
    .collect::<SpanCollector>();

    let values = choice((quoted_string, paramtext))
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    identifier()
        .then_ignore(just(Token::Equal))
        .then(values)
        .map(|(name, values)| RawParameter { name, values })
}

fn identifier<'tokens, 'src: 'tokens, I, E>() -> impl Parser<'tokens, I, SpanCollector, E> + Clone
where
    I: Input<'tokens, Token = Token<'src>, Span = SimpleSpan>,
    E: ParserExtra<'tokens, I>,
{
    select! { Token::Word(_) => () }
        .map_with(|(), e| e.span())
        .repeated()
        .at_least(1)
        .collect()
}

fn value<'tokens, 'src: 'tokens, I, E>() -> impl Parser<'tokens, I, SpanCollector, E> + Clone
where
    I: Input<'tokens, Token = Token<'src>, Span = SimpleSpan>,
    E: ParserExtra<'tokens, I>,
{
    select! { t if t != Token::Newline => () }
        .map_with(|(), e| e.span())
        .repeated()
        .collect()
}

/// Source ranges of one logical text. Folding leaves gaps between them.
#[derive(Debug, Clone, Default)]
struct SpanCollector(Vec<Span>);

impl SpanCollector {
    fn build(self, src: &str) -> String {
        self.0.iter().map(|span| span.slice(src)).collect()
    }
}

impl Container<SimpleSpan> for SpanCollector {
    fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }

    fn push(&mut self, span: SimpleSpan) {
        match self.0.last_mut() {
            Some(last) if last.end == span.start => last.end = span.end,
            _ => self.0.push(Span::from(span)),
        }
    }
}
