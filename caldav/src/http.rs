// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `reqwest`-backed transport.

use std::error::Error as _;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Settings;
use crate::error::{CalDavError, NetworkError};
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// HTTP transport for `CalDAV` operations.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a new HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(settings: &Settings) -> Result<Self, CalDavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .user_agent(&settings.user_agent)
            .danger_accept_invalid_certs(settings.ignore_ssl_errors)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = resp.bytes().await.map_err(classify)?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        NetworkError::Timeout
    } else if err.is_connect() {
        let chain = source_chain(&err).to_ascii_lowercase();
        if ["certificate", "tls", "handshake"].iter().any(|s| chain.contains(s)) {
            NetworkError::SslHandshakeFailed
        } else if ["dns", "resolve", "lookup"].iter().any(|s| chain.contains(s)) {
            NetworkError::HostNotFound
        } else {
            NetworkError::ConnectionRefused
        }
    } else {
        NetworkError::Other
    };
    TransportError::new(kind, source_chain(&err))
}

fn source_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }
    message
}
