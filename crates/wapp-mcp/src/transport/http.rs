//! HTTP transport: each JSON-RPC message is one POST to a fixed URL.

use std::time::Duration;

use serde_json::Value;

use super::{Transport, TransportType};
use crate::error::{McpError, Result};

/// Configuration for HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the MCP server.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Bearer token; `None` sends no `Authorization` header.
    pub auth_token: Option<String>,
    /// Additional headers.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(30),
            auth_token: None,
            headers: Vec::new(),
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP transport config with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Stateless HTTP transport.
///
/// Holds no session; every call is an independent request and may be retried
/// by the caller after a failure.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    config: HttpConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport. No request is sent.
    pub fn new(config: HttpConfig) -> Result<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| McpError::transport(format!("invalid URL: {}", e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| McpError::transport(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            url = %config.url,
            timeout_secs = config.timeout.as_secs(),
            authenticated = config.auth_token.is_some(),
            "created HTTP transport"
        );

        Ok(Self { client, config })
    }

    /// The configured endpoint.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// POST a JSON body and return the reply body as text.
    pub fn post(&self, body: &str) -> Result<String> {
        tracing::trace!(url = %self.config.url, json = %body, "sending MCP HTTP request");

        let request = self
            .authorize(self.client.post(&self.config.url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string());

        let text = Self::read_success(request.send().map_err(map_send_error)?)?;
        tracing::trace!(json = %text, "received MCP HTTP response");
        Ok(text)
    }

    /// POST a JSON value and parse the reply as JSON.
    pub fn post_json(&self, body: &Value) -> Result<Value> {
        let text = self.post(&serde_json::to_string(body)?)?;
        serde_json::from_str(&text).map_err(|e| McpError::malformed(e, &text))
    }

    /// GET the base URL; gateways answer with a status document.
    pub fn server_info(&self) -> Result<Value> {
        let request = self.authorize(self.client.get(&self.config.url));
        let text = Self::read_success(request.send().map_err(map_send_error)?)?;
        serde_json::from_str(&text).map_err(|e| McpError::malformed(e, &text))
    }

    fn authorize(
        &self,
        mut request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    fn read_success(response: reqwest::blocking::Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.text().map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout
            } else {
                McpError::transport(format!("failed to read response body: {}", e))
            }
        })
    }
}

impl Transport for HttpTransport {
    fn kind(&self) -> TransportType {
        TransportType::Http
    }

    fn round_trip(&mut self, message: &str) -> Result<String> {
        self.post(message)
    }

    fn receive(&mut self) -> Result<String> {
        Err(McpError::protocol(
            "HTTP response held a notification instead of a reply",
        ))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        // Servers answer notifications with an empty 202; the body is ignored.
        self.post(message).map(|_| ())
    }

    fn is_connected(&mut self) -> bool {
        true
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn map_send_error(e: reqwest::Error) -> McpError {
    if e.is_timeout() {
        McpError::Timeout
    } else {
        McpError::transport(format!("HTTP request failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_builder() {
        let config = HttpConfig::new("http://localhost:8080/mcp")
            .with_timeout(Duration::from_secs(60))
            .with_bearer_token("token123")
            .with_header("X-Trace", "1");

        assert_eq!(config.url, "http://localhost:8080/mcp");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.auth_token.as_deref(), Some("token123"));
        assert_eq!(
            config.headers,
            vec![("X-Trace".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_http_config_default() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.auth_token.is_none());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new(HttpConfig::new("http://localhost:8080/mcp")).unwrap();
        assert_eq!(transport.kind(), TransportType::Http);
        assert!(!transport.requires_handshake());
        assert_eq!(transport.url(), "http://localhost:8080/mcp");
    }

    #[test]
    fn test_http_transport_invalid_url() {
        let result = HttpTransport::new(HttpConfig::new("not a valid url"));
        match result {
            Err(McpError::Transport(msg)) => assert!(msg.contains("invalid URL")),
            _ => panic!("Expected Transport error"),
        }
    }

    #[test]
    fn test_http_transport_is_always_connected() {
        let mut transport =
            HttpTransport::new(HttpConfig::new("http://localhost:8080/mcp")).unwrap();
        assert!(transport.is_connected());
        assert!(transport.close().is_ok());
        assert!(transport.is_connected());
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is almost never listening on test machines.
        let transport = HttpTransport::new(
            HttpConfig::new("http://127.0.0.1:9/").with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let err = transport.post("{}").unwrap_err();
        assert!(err.is_unreachable(), "{err:?}");
    }
}
