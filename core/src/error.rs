// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use nbsync_caldav::{CalDavError, ErrorCode};

use crate::storage::StorageError;

/// Errors of a notebook sync pass.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A `CalDAV` request failed.
    #[error("CalDAV error: {0}")]
    CalDav(#[from] CalDavError),

    /// The local store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Classifies the error for the embedding application. Storage failures
    /// are internal errors.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CalDav(e) => e.code(),
            Self::Storage(_) => ErrorCode::InternalError,
        }
    }
}
