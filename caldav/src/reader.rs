// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Multistatus reader.
//!
//! Turns a `CalDAV` multistatus body into [`CalendarResource`] records, one
//! per `response` entry, with the embedded calendar data parsed into
//! incidences. Reading is all-or-nothing: any error discards every result.

use std::io::BufRead;

use nbsync_ical::{ParseError, parse_incidences};

use crate::types::{CalendarResource, ETag, Href};
use crate::xml::{Node, next_node, read_element_text, skip_element};

/// Why a multistatus body could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The XML itself is malformed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An entity reference could not be resolved.
    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Text is not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The document root is not a multistatus element.
    #[error("no multistatus element found")]
    MissingMultistatus,

    /// The document ends inside an element.
    #[error("unexpected end of document")]
    UnexpectedEof,

    /// Embedded calendar data could not be parsed.
    #[error("invalid calendar data for {href}: {source}")]
    Calendar {
        /// Href of the offending entry.
        href: String,
        /// Underlying error.
        source: ParseError,
    },
}

/// Reads multistatus response bodies.
#[derive(Debug, Default)]
pub struct Reader {
    results: Vec<CalendarResource>,
    error: Option<ReadError>,
}

impl Reader {
    /// Creates an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a response body, replacing any previous results.
    pub fn read(&mut self, data: &[u8]) {
        match read_multistatus(data) {
            Ok(results) => {
                tracing::debug!(resources = results.len(), "read multistatus response");
                self.results = results;
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read multistatus response");
                self.results.clear();
                self.error = Some(err);
            }
        }
    }

    /// Whether the last read failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Why the last read failed.
    #[must_use]
    pub fn error(&self) -> Option<&ReadError> {
        self.error.as_ref()
    }

    /// Resources from the last successful read.
    #[must_use]
    pub fn results(&self) -> &[CalendarResource] {
        &self.results
    }

    /// Takes the resources from the last successful read.
    #[must_use]
    pub fn into_results(self) -> Vec<CalendarResource> {
        self.results
    }
}

fn read_multistatus(data: &[u8]) -> Result<Vec<CalendarResource>, ReadError> {
    let mut reader = quick_xml::Reader::from_reader(data);
    reader.config_mut().check_end_names = true;
    let mut buf = Vec::new();

    loop {
        match next_node(&mut reader, &mut buf)? {
            Node::Start(name) if name == b"multistatus" => break,
            Node::Empty(name) if name == b"multistatus" => return Ok(Vec::new()),
            Node::Start(_) | Node::Empty(_) | Node::End(_) | Node::Eof => {
                return Err(ReadError::MissingMultistatus);
            }
            Node::Text(t) if !t.trim().is_empty() => return Err(ReadError::MissingMultistatus),
            Node::Text(_) | Node::Other => {}
        }
    }

    let mut resources = Vec::new();
    loop {
        match next_node(&mut reader, &mut buf)? {
            Node::Start(name) if name == b"response" => {
                resources.push(read_response(&mut reader, &mut buf)?);
            }
            // sync-token, responsedescription
            Node::Start(_) => skip_element(&mut reader, &mut buf)?,
            Node::End(_) => return Ok(resources),
            Node::Eof => return Err(ReadError::UnexpectedEof),
            Node::Empty(_) | Node::Text(_) | Node::Other => {}
        }
    }
}

#[derive(Debug, Default)]
struct PropStat {
    etag: Option<String>,
    calendar_data: Option<String>,
    status: Option<String>,
}

impl PropStat {
    /// A propstat without a status line is taken as successful.
    fn is_success(&self) -> bool {
        self.status.as_deref().is_none_or(status_is_success)
    }
}

fn status_is_success(status_line: &str) -> bool {
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .is_some_and(|code| (200..300).contains(&code))
}

fn read_response<R: BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<CalendarResource, ReadError> {
    let mut href = String::new();
    let mut etag = None;
    let mut calendar_data = None;

    loop {
        match next_node(reader, buf)? {
            Node::Start(name) => match name.as_slice() {
                b"href" => href = read_element_text(reader, buf)?.trim().to_string(),
                b"propstat" => {
                    let propstat = read_propstat(reader, buf)?;
                    if propstat.is_success() {
                        etag = propstat.etag.or(etag);
                        calendar_data = propstat.calendar_data.or(calendar_data);
                    } else {
                        tracing::debug!(
                            href = %href,
                            status = propstat.status.as_deref().unwrap_or_default(),
                            "ignoring propstat with error status"
                        );
                    }
                }
                _ => skip_element(reader, buf)?,
            },
            Node::End(_) => break,
            Node::Eof => return Err(ReadError::UnexpectedEof),
            Node::Empty(_) | Node::Text(_) | Node::Other => {}
        }
    }

    let incidences = match calendar_data.as_deref().map(str::trim) {
        Some(data) if !data.is_empty() => {
            parse_incidences(data).map_err(|source| ReadError::Calendar {
                href: href.clone(),
                source,
            })?
        }
        _ => Vec::new(),
    };
    tracing::debug!(href = %href, incidences = incidences.len(), "read calendar resource");

    Ok(CalendarResource::new(
        Href::new(href),
        etag.filter(|e: &String| !e.is_empty()).map(ETag::new),
        incidences,
    ))
}

fn read_propstat<R: BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<PropStat, ReadError> {
    let mut propstat = PropStat::default();
    loop {
        match next_node(reader, buf)? {
            Node::Start(name) => match name.as_slice() {
                b"prop" => read_prop(reader, buf, &mut propstat)?,
                b"status" => propstat.status = Some(read_element_text(reader, buf)?.trim().to_string()),
                _ => skip_element(reader, buf)?,
            },
            Node::End(_) => return Ok(propstat),
            Node::Eof => return Err(ReadError::UnexpectedEof),
            Node::Empty(_) | Node::Text(_) | Node::Other => {}
        }
    }
}

fn read_prop<R: BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
    propstat: &mut PropStat,
) -> Result<(), ReadError> {
    loop {
        match next_node(reader, buf)? {
            Node::Start(name) => match name.as_slice() {
                b"getetag" => propstat.etag = Some(read_element_text(reader, buf)?.trim().to_string()),
                b"calendar-data" => propstat.calendar_data = Some(read_element_text(reader, buf)?),
                other => {
                    tracing::debug!(
                        element = %String::from_utf8_lossy(other),
                        "skipping unrecognized property"
                    );
                    skip_element(reader, buf)?;
                }
            },
            Node::End(_) => return Ok(()),
            Node::Eof => return Err(ReadError::UnexpectedEof),
            Node::Empty(_) | Node::Text(_) | Node::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_parsing() {
        assert!(status_is_success("HTTP/1.1 200 OK"));
        assert!(status_is_success("HTTP/1.1 207 Multi-Status"));
        assert!(!status_is_success("HTTP/1.1 404 Not Found"));
        assert!(!status_is_success("garbage"));
    }

    #[test]
    fn empty_and_non_xml_input_is_an_error() {
        for input in [&b""[..], b"hello world", b"<html><body/></html>"] {
            let mut reader = Reader::new();
            reader.read(input);
            assert!(reader.has_error(), "{:?}", String::from_utf8_lossy(input));
            assert!(reader.results().is_empty());
        }
    }

    #[test]
    fn unclosed_multistatus_is_an_error() {
        let mut reader = Reader::new();
        reader.read(b"<d:multistatus xmlns:d=\"DAV:\"><d:response><d:href>/a.ics</d:href>");
        assert!(reader.has_error());
        assert!(matches!(reader.error(), Some(ReadError::UnexpectedEof)));
    }

    #[test]
    fn failed_read_discards_previous_results() {
        let mut reader = Reader::new();
        reader.read(
            b"<d:multistatus xmlns:d=\"DAV:\"><d:response><d:href>/a.ics</d:href></d:response></d:multistatus>",
        );
        assert_eq!(reader.results().len(), 1);

        reader.read(b"<d:multistatus xmlns:d=\"DAV:\">");
        assert!(reader.has_error());
        assert!(reader.results().is_empty());
    }
}
