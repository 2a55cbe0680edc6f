//! HTTP transport used by the paper feed client
//!
//! The client talks to the network only through [`HttpRequester`], so tests can
//! substitute a scripted implementation for [`ReqwestRequester`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by a transport before any HTTP status is available
#[derive(Debug, Error)]
pub enum TransportError {
    /// reqwest failed to send the request or read the body
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other transport failure
    #[error("{0}")]
    Other(String),
}

/// A fully-read HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers, keyed by lowercase name
    pub headers: BTreeMap<String, String>,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Builds a response with a status and body and no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header, normalizing its name to lowercase
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a header case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends the two kinds of request the paper feed needs
#[async_trait]
pub trait HttpRequester: Send + Sync {
    /// POSTs `body` as JSON
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, TransportError>;

    /// GETs `url` with the given extra headers
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<HttpResponse, TransportError>;
}

/// [`HttpRequester`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct ReqwestRequester {
    client: Client,
}

impl ReqwestRequester {
    /// Create a requester with a default reqwest client
    pub fn new() -> Self {
        Self::default()
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpRequester for ReqwestRequester {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, TransportError> {
        let response = self.client.post(url).json(body).send().await?;
        Self::read(response).await
    }

    async fn get(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await?;
        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(200, "").with_header("Authorization", "abc");

        assert_eq!(response.header("authorization"), Some("abc"));
        assert_eq!(response.header("AUTHORIZATION"), Some("abc"));
        assert_eq!(response.header("cookie"), None);
    }

    #[test]
    fn test_is_success_covers_2xx_only() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
    }

    #[tokio::test]
    async fn test_reqwest_requester_reports_connection_failure() {
        let requester = ReqwestRequester::new();

        // Port 9 on loopback is the discard service and is not normally listening
        let result = requester.get("http://127.0.0.1:9/", &[]).await;

        assert!(matches!(result, Err(TransportError::Http(_))));
    }
}
