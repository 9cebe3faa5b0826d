// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `CalDAV` plumbing for nbsync: REPORT queries, uploads and deletions, and
//! the multistatus reader (RFC 4791).

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

mod config;
mod delete;
mod error;
mod http;
mod put;
mod reader;
mod report;
mod request;
mod transport;
mod types;
mod xml;

pub use crate::config::{AuthMethod, Settings};
pub use crate::delete::Delete;
pub use crate::error::{CalDavError, ErrorCode, NetworkError};
pub use crate::http::HttpTransport;
pub use crate::put::Put;
pub use crate::reader::{ReadError, Reader};
pub use crate::report::Report;
pub use crate::request::{CalendarMultiGetRequest, CalendarQueryRequest, Request, TimeRange};
pub use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
pub use crate::types::{CalendarResource, ETag, Href};
