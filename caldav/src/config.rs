// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// `CalDAV` authentication method.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password), sent as URL credentials.
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication (OAuth).
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// Account settings shared by every request of a sync session.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    /// Server base address, e.g. `https://dav.example.com`.
    pub server_address: String,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub ignore_ssl_errors: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("nbsync-caldav/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Settings {
    /// Creates settings for a server without authentication.
    #[must_use]
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            ..Self::default()
        }
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            auth: AuthMethod::default(),
            ignore_ssl_errors: false,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
