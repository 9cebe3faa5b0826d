// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request builders and the shared request context for `CalDAV` operations.

use std::io::Cursor;
use std::sync::Arc;

use nbsync_ical::CalDateTime;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use reqwest::{Method, Url};
use tokio_util::sync::CancellationToken;

use crate::config::{AuthMethod, Settings};
use crate::error::CalDavError;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::Href;
use crate::xml::ns;

/// Time range filter for calendar queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound.
    pub start: Option<CalDateTime>,
    /// Upper bound.
    pub end: Option<CalDateTime>,
}

impl TimeRange {
    /// Creates a time range from optional bounds.
    #[must_use]
    pub const fn new(start: Option<CalDateTime>, end: Option<CalDateTime>) -> Self {
        Self { start, end }
    }

    /// Whether neither bound is present.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Formats a bound as `yyyyMMddTHHmmss`, with a `Z` suffix only for UTC.
fn format_bound(value: &CalDateTime) -> String {
    match value {
        CalDateTime::Date(d) => d.strftime("%Y%m%dT000000").to_string(),
        _ => value.to_basic_format(),
    }
}

/// Calendar query request builder.
#[derive(Debug, Clone, Default)]
pub struct CalendarQueryRequest {
    with_data: bool,
    time_range: Option<TimeRange>,
}

impl CalendarQueryRequest {
    /// Creates a query for etags only.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            with_data: false,
            time_range: None,
        }
    }

    /// Also requests the calendar data of each resource.
    #[must_use]
    pub const fn with_data(mut self, with_data: bool) -> Self {
        self.with_data = with_data;
        self
    }

    /// Sets the time range filter. An unbounded range emits no filter.
    #[must_use]
    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = (!range.is_unbounded()).then_some(range);
        self
    }

    /// Builds the XML body for the calendar query request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        // <c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
        let mut calendar_query = BytesStart::new("c:calendar-query");
        calendar_query.push_attribute(("xmlns:d", ns::DAV));
        calendar_query.push_attribute(("xmlns:c", ns::CALDAV));
        writer.write_event(Event::Start(calendar_query))?;

        write_prop(&mut writer, self.with_data)?;

        writer.write_event(Event::Start(BytesStart::new("c:filter")))?;
        let mut comp_filter = BytesStart::new("c:comp-filter");
        comp_filter.push_attribute(("name", "VCALENDAR"));
        writer.write_event(Event::Start(comp_filter))?;

        if let Some(range) = &self.time_range {
            let mut event_filter = BytesStart::new("c:comp-filter");
            event_filter.push_attribute(("name", "VEVENT"));
            writer.write_event(Event::Start(event_filter))?;

            let mut time_range = BytesStart::new("c:time-range");
            if let Some(start) = &range.start {
                time_range.push_attribute(("start", format_bound(start).as_str()));
            }
            if let Some(end) = &range.end {
                time_range.push_attribute(("end", format_bound(end).as_str()));
            }
            writer.write_event(Event::Empty(time_range))?;

            writer.write_event(Event::End(BytesEnd::new("c:comp-filter")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("c:comp-filter")))?;
        writer.write_event(Event::End(BytesEnd::new("c:filter")))?;
        writer.write_event(Event::End(BytesEnd::new("c:calendar-query")))?;

        into_string(writer)
    }
}

/// Calendar multiget request builder.
#[derive(Debug, Clone, Default)]
pub struct CalendarMultiGetRequest {
    hrefs: Vec<Href>,
    with_data: bool,
}

impl CalendarMultiGetRequest {
    /// Creates a multiget for etags only.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hrefs: Vec::new(),
            with_data: false,
        }
    }

    /// Also requests the calendar data of each resource.
    #[must_use]
    pub const fn with_data(mut self, with_data: bool) -> Self {
        self.with_data = with_data;
        self
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: Href) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Whether no href was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hrefs.is_empty()
    }

    /// Builds the XML body for the calendar multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, CalDavError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut multiget = BytesStart::new("c:calendar-multiget");
        multiget.push_attribute(("xmlns:d", ns::DAV));
        multiget.push_attribute(("xmlns:c", ns::CALDAV));
        writer.write_event(Event::Start(multiget))?;

        write_prop(&mut writer, self.with_data)?;

        for href in &self.hrefs {
            writer.write_event(Event::Start(BytesStart::new("d:href")))?;
            writer.write_event(Event::Text(BytesText::new(href.as_str())))?;
            writer.write_event(Event::End(BytesEnd::new("d:href")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("c:calendar-multiget")))?;

        into_string(writer)
    }
}

fn write_prop(writer: &mut Writer<Cursor<Vec<u8>>>, with_data: bool) -> Result<(), CalDavError> {
    writer.write_event(Event::Start(BytesStart::new("d:prop")))?;
    writer.write_event(Event::Empty(BytesStart::new("d:getetag")))?;
    if with_data {
        writer.write_event(Event::Empty(BytesStart::new("c:calendar-data")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("d:prop")))?;
    Ok(())
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> Result<String, CalDavError> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| CalDavError::Xml(format!("UTF-8 error: {e}")))
}

/// Context shared by every request of a sync session: settings, transport
/// and the cancellation token of the owner.
#[derive(Debug, Clone)]
pub struct Request {
    settings: Arc<Settings>,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl Request {
    /// Creates a request context.
    #[must_use]
    pub fn new(
        settings: Arc<Settings>,
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            transport,
            cancel,
        }
    }

    /// The account settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The cancellation token checked around every exchange.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Prepares a request for `path` on the configured server.
    ///
    /// The path replaces the path of the server address; an absolute URL is
    /// used as is. Bearer tokens go into an `Authorization` header, basic
    /// credentials into the URL.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::InvalidUrl`] if the address or path is invalid.
    pub fn prepare(&self, method: Method, path: &str) -> Result<HttpRequest, CalDavError> {
        let invalid = |url: &str, e: &dyn std::fmt::Display| CalDavError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut url = match Url::parse(path) {
            Ok(url) if url.has_host() => url,
            _ => {
                let mut url = Url::parse(&self.settings.server_address)
                    .map_err(|e| invalid(&self.settings.server_address, &e))?;
                url.set_path(path);
                url
            }
        };

        let request = match &self.settings.auth {
            AuthMethod::Bearer { token } => HttpRequest::new(method, url)
                .header("Authorization", format!("Bearer {token}")),
            AuthMethod::Basic { username, password } => {
                url.set_username(username)
                    .and_then(|()| url.set_password(Some(password)))
                    .map_err(|()| invalid(path, &"URL cannot carry credentials"))?;
                HttpRequest::new(method, url)
            }
            AuthMethod::None => HttpRequest::new(method, url),
        };
        Ok(request)
    }

    /// Sends a prepared request.
    ///
    /// Error statuses are returned as responses; callers classify them.
    ///
    /// # Errors
    ///
    /// Returns [`CalDavError::Aborted`] if the token was cancelled before the
    /// request was sent or before its completion is handled, and
    /// [`CalDavError::Network`] on transport failure.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, CalDavError> {
        if self.cancel.is_cancelled() {
            return Err(CalDavError::Aborted);
        }

        tracing::trace!(?request, "sending request");
        let result = self.transport.send(request).await;

        if self.cancel.is_cancelled() {
            tracing::debug!("request completed after cancellation, dropping reply");
            return Err(CalDavError::Aborted);
        }

        let response = result?;
        tracing::trace!(
            status = response.status,
            body = %String::from_utf8_lossy(&response.body),
            "received response"
        );
        Ok(response)
    }
}

/// Maps a reply status to the shared classification of uploads and
/// deletions: 405 is a successful no-op, other non-2xx statuses fail.
pub(crate) fn check_modify_status(
    method: &'static str,
    response: &HttpResponse,
) -> Result<bool, CalDavError> {
    match response.status {
        405 => {
            tracing::debug!(method, "permission denied, treating as no-op");
            Ok(false)
        }
        s if (200..300).contains(&s) => Ok(true),
        status => Err(CalDavError::Status { method, status }),
    }
}
