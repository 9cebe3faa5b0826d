// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV processing.

use std::io::BufRead;

use quick_xml::events::{BytesRef, Event};

use crate::reader::ReadError;

/// XML namespaces used in `CalDAV`.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";
}

/// An owned, namespace-stripped view of the next XML event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Start tag, by local name.
    Start(Vec<u8>),
    /// Self-closing tag, by local name.
    Empty(Vec<u8>),
    /// End tag, by local name.
    End(Vec<u8>),
    /// Character data with entities resolved; CDATA is passed through raw.
    Text(String),
    /// End of input.
    Eof,
    /// Declarations, comments, processing instructions.
    Other,
}

/// Reads the next event as a [`Node`].
///
/// # Errors
///
/// Returns an error if the XML is malformed or an entity cannot be resolved.
pub fn next_node<R: BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<Node, ReadError> {
    buf.clear();
    Ok(match reader.read_event_into(buf)? {
        Event::Start(e) => Node::Start(e.name().local_name().into_inner().to_vec()),
        Event::Empty(e) => Node::Empty(e.name().local_name().into_inner().to_vec()),
        Event::End(e) => Node::End(e.name().local_name().into_inner().to_vec()),
        Event::Text(e) => Node::Text(e.decode().map_err(quick_xml::Error::from)?.into_owned()),
        Event::CData(e) => Node::Text(std::str::from_utf8(&e)?.to_string()),
        Event::GeneralRef(e) => Node::Text(resolve_reference(&e)?),
        Event::Eof => Node::Eof,
        _ => Node::Other,
    })
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, ReadError> {
    let name = std::str::from_utf8(reference)?;
    let entity = format!("&{name};");
    let text = quick_xml::escape::unescape(&entity)?;
    Ok(text.into_owned())
}

/// Reads the text content of the element whose start tag was just consumed,
/// up to and including its end tag.
///
/// Text of nested elements is included.
///
/// # Errors
///
/// Returns an error if the XML is malformed or ends inside the element.
pub fn read_element_text<R: BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<String, ReadError> {
    let mut text = String::new();
    let mut depth = 1_usize;
    loop {
        match next_node(reader, buf)? {
            Node::Start(_) => depth += 1,
            Node::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(text);
                }
            }
            Node::Text(t) => text.push_str(&t),
            Node::Eof => return Err(ReadError::UnexpectedEof),
            Node::Empty(_) | Node::Other => {}
        }
    }
}

/// Skips the element whose start tag was just consumed.
///
/// # Errors
///
/// Returns an error if the XML is malformed or ends inside the element.
pub fn skip_element<R: BufRead>(
    reader: &mut quick_xml::Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<(), ReadError> {
    read_element_text(reader, buf).map(|_| ())
}
