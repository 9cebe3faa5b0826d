// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use reqwest::Method;

use crate::error::CalDavError;
use crate::request::{Request, check_modify_status};
use crate::types::{ETag, Href};

/// Removes calendar resources.
#[derive(Debug, Clone)]
pub struct Delete {
    request: Request,
}

impl Delete {
    /// Creates a deleter using the given request context.
    #[must_use]
    pub const fn new(request: Request) -> Self {
        Self { request }
    }

    /// Deletes the resource at `href`, conditional on `etag` when given.
    ///
    /// A resource that is already gone (404, 410) or read-only (405) counts
    /// as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_resource(&self, href: &Href, etag: Option<&ETag>) -> Result<(), CalDavError> {
        let mut request = self.request.prepare(Method::DELETE, href)?;
        if let Some(etag) = etag {
            request = request.header("If-Match", etag.as_str());
        }

        let response = self.request.execute(request).await?;
        if matches!(response.status, 404 | 410) {
            tracing::debug!(status = response.status, "resource already gone");
            return Ok(());
        }
        check_modify_status("DELETE", &response)?;
        Ok(())
    }
}
