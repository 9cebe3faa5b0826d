// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Value codecs for the property value types the model uses.

use chumsky::extra::ParserExtra;
use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use jiff::SignedDuration;

/// Error for a property value that does not match its value type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// DATE or DATE-TIME value is malformed
    #[error("invalid date-time value: {0}")]
    DateTime(String),

    /// DURATION value is malformed
    #[error("invalid duration value: {0}")]
    Duration(String),

    /// INTEGER or FLOAT value is malformed
    #[error("invalid number: {0}")]
    Number(String),

    /// RECUR value is malformed
    #[error("invalid recurrence rule: {0}")]
    Rule(String),
}

/// Resolves TEXT escapes (`\\`, `\;`, `\,`, `\n`, `\N`) and drops carriage
/// returns.
#[must_use]
pub fn unescape_text(value: &str) -> String {
    value_text::<_, extra::Default>(false)
        .parse(text_input(value))
        .into_output()
        .unwrap_or_default()
}

/// Splits a TEXT list on unescaped commas and unescapes each item.
#[must_use]
pub fn split_text_list(value: &str) -> Vec<String> {
    let mut items = value_text::<_, extra::Default>(true)
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .parse(text_input(value))
        .into_output()
        .unwrap_or_default();
    items.retain(|s| !s.is_empty());
    items
}

fn text_input(value: &str) -> impl ValueInput<'_, Token = char, Span = SimpleSpan> {
    Stream::from_iter(value.chars().filter(|&c| c != '\r'))
}

/// ```txt
/// text         = *(TSAFE-CHAR / ":" / DQUOTE / ESCAPED-CHAR)
/// ESCAPED-CHAR = ("\\" / "\;" / "\," / "\N" / "\n")
/// ```
///
/// Unknown escapes keep the escaped character; a trailing backslash is kept.
fn value_text<'src, I, E>(in_list: bool) -> impl Parser<'src, I, String, E> + Clone
where
    I: ValueInput<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    let escape = just('\\').ignore_then(any().or_not()).map(|c| match c {
        Some('n' | 'N') => '\n',
        Some(c) => c,
        None => '\\',
    });
    let plain = select! { c if c != '\\' && !(in_list && c == ',') => c };

    choice((escape, plain)).repeated().collect()
}

/// Escapes a string for use as a TEXT value.
#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Parses an integer value.
///
/// # Errors
///
/// Returns [`ValueError::Number`] if the value is not a valid integer.
pub fn parse_integer<T: lexical::FromLexical>(value: &str) -> Result<T, ValueError> {
    lexical::parse::<T, _>(value.trim()).map_err(|_| ValueError::Number(value.to_string()))
}

/// Parses a float value.
///
/// # Errors
///
/// Returns [`ValueError::Number`] if the value is not a valid float.
pub fn parse_float(value: &str) -> Result<f64, ValueError> {
    lexical::parse::<f64, _>(value.trim()).map_err(|_| ValueError::Number(value.to_string()))
}

/// Parses a DURATION value such as `-PT15M` or `P1DT2H`.
///
/// Week and day designators are taken as nominal 7 and 1 day(s) of 24 hours.
/// Designators are matched case-insensitively.
///
/// # Errors
///
/// Returns [`ValueError::Duration`] if the value does not follow RFC 5545
/// section 3.3.6.
pub fn parse_duration(value: &str) -> Result<SignedDuration, ValueError> {
    let chars = value.trim().chars().map(|c| c.to_ascii_uppercase());
    value_duration::<_, extra::Default>()
        .parse(Stream::from_iter(chars))
        .into_result()
        .map_err(|_| ValueError::Duration(value.to_string()))
}

/// ```txt
/// dur-value  = (["+"] / "-") "P" (dur-date / dur-time / dur-week)
///
/// dur-date   = dur-day [dur-time]
/// dur-time   = "T" (dur-hour / dur-minute / dur-second)
/// dur-week   = 1*DIGIT "W"
/// dur-hour   = 1*DIGIT "H" [dur-minute]
/// dur-minute = 1*DIGIT "M" [dur-second]
/// dur-second = 1*DIGIT "S"
/// dur-day    = 1*DIGIT "D"
/// ```
fn value_duration<'src, I, E>() -> impl Parser<'src, I, SignedDuration, E>
where
    I: ValueInput<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    // at most 10 digits, so no sum of components can overflow
    let int = select! { c @ '0'..='9' => i64::from(c.to_digit(10).unwrap_or_default()) }
        .repeated()
        .at_least(1)
        .at_most(10)
        .collect::<Vec<_>>()
        .map(|digits| digits.into_iter().fold(0, |n, digit| n * 10 + digit));
    let unit = |designator: char, secs: i64| {
        int.clone()
            .then_ignore(just(designator))
            .map(move |n| n * secs)
    };

    let second = unit('S', 1);
    let minute = unit('M', 60);
    let hour = unit('H', 3_600);

    let minute_with_second = minute
        .then(second.clone().or_not())
        .map(|(m, s)| m + s.unwrap_or(0));
    let hour_with_minute = hour
        .then(minute_with_second.clone().or_not())
        .map(|(h, ms)| h + ms.unwrap_or(0));
    let time = just('T').ignore_then(choice((hour_with_minute, minute_with_second, second)));

    let date = unit('D', 86_400)
        .then(time.clone().or_not())
        .map(|(d, t)| d + t.unwrap_or(0));
    let week = unit('W', 7 * 86_400);

    let negative = select! { c @ ('+' | '-') => c }
        .or_not()
        .map(|sign| sign == Some('-'));

    negative
        .then_ignore(just('P'))
        .then(choice((date, time, week)))
        .map(|(negative, secs)| SignedDuration::from_secs(if negative { -secs } else { secs }))
}

/// Formats a duration as a DURATION value.
#[must_use]
pub fn format_duration(duration: SignedDuration) -> String {
    let total = duration.as_secs();
    let mut out = String::new();
    if total < 0 {
        out.push('-');
    }
    out.push('P');

    let total = total.unsigned_abs();
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if rem > 0 || total == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || total == 0 {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}
