// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use nbsync_ical::CalDateTime;
use reqwest::Method;

use crate::error::CalDavError;
use crate::reader::Reader;
use crate::request::{CalendarMultiGetRequest, CalendarQueryRequest, Request, TimeRange};
use crate::types::{CalendarResource, Href};

const METHOD: &str = "REPORT";

/// Issues calendar-query and calendar-multiget REPORTs against one
/// collection and keeps the resources of the last successful reply.
///
/// Only one query is in flight at a time; every query takes `&mut self`.
#[derive(Debug)]
pub struct Report {
    request: Request,
    resources: Vec<CalendarResource>,
}

impl Report {
    /// Creates a report using the given request context.
    #[must_use]
    pub const fn new(request: Request) -> Self {
        Self {
            request,
            resources: Vec::new(),
        }
    }

    /// Fetches every event of the collection at `path`, with calendar data,
    /// optionally limited to the given range.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be read.
    pub async fn get_all_events(
        &mut self,
        path: &str,
        from: Option<CalDateTime>,
        to: Option<CalDateTime>,
    ) -> Result<(), CalDavError> {
        let body = CalendarQueryRequest::new()
            .with_data(true)
            .time_range(TimeRange::new(from, to))
            .build()?;
        self.send(path, body).await
    }

    /// Fetches the etag of every resource of the collection at `path`,
    /// optionally limited to the given range.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be read.
    pub async fn get_all_etags(
        &mut self,
        path: &str,
        from: Option<CalDateTime>,
        to: Option<CalDateTime>,
    ) -> Result<(), CalDavError> {
        let body = CalendarQueryRequest::new()
            .time_range(TimeRange::new(from, to))
            .build()?;
        self.send(path, body).await
    }

    /// Fetches the given resources with calendar data. Nothing is sent for an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be read.
    pub async fn multi_get_events(&mut self, path: &str, hrefs: &[Href]) -> Result<(), CalDavError> {
        self.multi_get(path, hrefs, true).await
    }

    /// Fetches the etags of the given resources. Nothing is sent for an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be read.
    pub async fn multi_get_etags(&mut self, path: &str, hrefs: &[Href]) -> Result<(), CalDavError> {
        self.multi_get(path, hrefs, false).await
    }

    /// Resources of the last successful query.
    #[must_use]
    pub fn received_calendar_resources(&self) -> &[CalendarResource] {
        &self.resources
    }

    /// Takes the resources of the last successful query.
    #[must_use]
    pub fn into_calendar_resources(self) -> Vec<CalendarResource> {
        self.resources
    }

    async fn multi_get(
        &mut self,
        path: &str,
        hrefs: &[Href],
        with_data: bool,
    ) -> Result<(), CalDavError> {
        if hrefs.is_empty() {
            tracing::debug!(path, "no hrefs to fetch, skipping multiget");
            return Ok(());
        }

        let mut multiget = CalendarMultiGetRequest::new().with_data(with_data);
        for href in hrefs {
            multiget.add_href(href.clone());
        }
        self.send(path, multiget.build()?).await
    }

    #[tracing::instrument(skip(self, body), fields(body_len = body.len()))]
    async fn send(&mut self, path: &str, body: String) -> Result<(), CalDavError> {
        let method = Method::from_bytes(METHOD.as_bytes()).map_err(|e| CalDavError::Client(e.to_string()))?;
        let request = self
            .request
            .prepare(method, path)?
            .header("Depth", "1")
            .header("Prefer", "return-minimal")
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(body);

        let response = self.request.execute(request).await?;
        if response.status > 299 {
            tracing::warn!(status = response.status, "REPORT failed");
            return Err(CalDavError::Status {
                method: METHOD,
                status: response.status,
            });
        }
        if response.body.is_empty() {
            tracing::warn!("REPORT returned an empty body");
            return Err(CalDavError::EmptyBody(METHOD));
        }

        let mut reader = Reader::new();
        reader.read(&response.body);
        if reader.has_error() {
            return Err(CalDavError::MalformedBody(METHOD));
        }

        self.resources = reader.into_results();
        tracing::debug!(resources = self.resources.len(), "REPORT succeeded");
        Ok(())
    }
}
