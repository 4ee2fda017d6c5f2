//! HTTP transport backed by `reqwest`
//!
//! Issues exactly the request it is handed. Relative URLs are not resolved
//! here; `DavClient` does that before a request reaches the transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::transport::{DavRequest, DavResponse, Transport};

/// Transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Location relative paths are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(
        default = "default_user_agent",
        skip_serializing_if = "is_default_user_agent"
    )]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("kdbx-dav/{}", env!("CARGO_PKG_VERSION"))
}

fn is_default_user_agent(agent: &str) -> bool {
    agent == default_user_agent()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            base_url: None,
            user_agent: default_user_agent(),
        }
    }
}

/// WebDAV transport over HTTP/HTTPS
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::from_config(&TransportConfig::default())
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(config.user_agent.clone())
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn network_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Network(format!("timed out: {err}"))
    } else {
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(&self, request: DavRequest) -> Result<DavResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| network_error(&e))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| network_error(&e))?;

        Ok(DavResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdbx_dav_protocol::Method;

    #[test]
    fn config_defaults() {
        let config: TransportConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.base_url.is_none());
        assert!(config.user_agent.starts_with("kdbx-dav/"));
    }

    #[test]
    fn config_overrides() {
        let config: TransportConfig = toml::from_str(
            r#"
            timeout_secs = 5
            base_url = "https://dav.example.com/files/"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.base_url.as_deref(), Some("https://dav.example.com/files/"));
    }

    #[tokio::test]
    async fn relative_url_is_a_network_error() {
        let transport = HttpTransport::new();
        let result = transport
            .issue(DavRequest {
                method: Method::Head,
                url: "/db.kdbx".into(),
                headers: http::HeaderMap::new(),
                body: None,
            })
            .await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
