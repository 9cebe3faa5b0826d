// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use nbsync_ical::{Incidence, format_incidences};
use reqwest::Method;

use crate::error::CalDavError;
use crate::request::{Request, check_modify_status};
use crate::types::{ETag, Href};

/// Uploads calendar resources.
#[derive(Debug, Clone)]
pub struct Put {
    request: Request,
}

impl Put {
    /// Creates an uploader using the given request context.
    #[must_use]
    pub const fn new(request: Request) -> Self {
        Self { request }
    }

    /// Uploads `incidences` as one calendar object to `href`.
    ///
    /// With a known `etag` the upload is conditional on it (`If-Match`),
    /// otherwise it only creates (`If-None-Match: *`). Returns the new etag
    /// when the server sent one. A read-only resource (405) is a no-op and
    /// yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    #[tracing::instrument(skip(self, incidences), fields(count = incidences.len()))]
    pub async fn send_incidences(
        &self,
        href: &Href,
        incidences: &[Incidence],
        etag: Option<&ETag>,
    ) -> Result<Option<ETag>, CalDavError> {
        let body = format_incidences(incidences);
        let request = self
            .request
            .prepare(Method::PUT, href)?
            .header("Content-Type", "text/calendar; charset=utf-8");
        let request = match etag {
            Some(etag) => request.header("If-Match", etag.as_str()),
            None => request.header("If-None-Match", "*"),
        };

        let response = self.request.execute(request.body(body)).await?;
        if !check_modify_status("PUT", &response)? {
            return Ok(None);
        }

        let etag = response.header("ETag").map(ETag::from);
        tracing::debug!(?etag, "uploaded resource");
        Ok(etag)
    }
}
