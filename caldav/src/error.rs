// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::transport::TransportError;

/// Coarse classification reported to the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Credentials were rejected, or the TLS handshake failed.
    AuthenticationFailure,
    /// The server could not be reached.
    ConnectionError,
    /// Anything else.
    InternalError,
}

/// Network-layer failure kinds reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Connection refused or reset.
    ConnectionRefused,
    /// Host name could not be resolved.
    HostNotFound,
    /// The request timed out.
    Timeout,
    /// TLS handshake failed, e.g. an untrusted certificate.
    SslHandshakeFailed,
    /// Any other transport failure.
    Other,
}

/// `CalDAV` request errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CalDavError {
    /// Transport failed before a response was received.
    #[error("network error ({kind:?}): {message}")]
    Network {
        /// Failure kind.
        kind: NetworkError,
        /// Transport message.
        message: String,
    },

    /// Server answered with an error status.
    #[error("Got error status response for {method}: {status}")]
    Status {
        /// HTTP method of the request.
        method: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// Server answered without a body where one was required.
    #[error("Empty response body for {0}")]
    EmptyBody(&'static str),

    /// Response body could not be read.
    #[error("Malformed response body for {0}")]
    MalformedBody(&'static str),

    /// Server address or request path is not a valid URL.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// XML writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The caller cancelled the request.
    #[error("request aborted")]
    Aborted,
}

impl CalDavError {
    /// Classifies the error for the embedding application.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network {
                kind: NetworkError::SslHandshakeFailed,
                ..
            }
            | Self::Status {
                status: 401 | 403, ..
            } => ErrorCode::AuthenticationFailure,
            Self::Network { .. } => ErrorCode::ConnectionError,
            _ => ErrorCode::InternalError,
        }
    }
}

impl From<TransportError> for CalDavError {
    fn from(e: TransportError) -> Self {
        Self::Network {
            kind: e.kind,
            message: e.message,
        }
    }
}

impl From<reqwest::Error> for CalDavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Client(e.to_string())
    }
}

impl From<quick_xml::Error> for CalDavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for CalDavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
