use crate::{Error, ErrorContext, Result};
use reqwest::Proxy;
use serde_json::Value;
use std::env;
use std::time::Duration;

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(
                env::var("COLUMN_MATCHER_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("COLUMN_MATCHER_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// The API key travels as the `key` query parameter. Non-2xx statuses become
    /// [`Error::Remote`] carrying the provider's error message when it sent one.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(http_error)?;

        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                message: remote_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::parse_with_context(
                "response body is not JSON",
                ErrorContext::new()
                    .with_field_path(path)
                    .with_details(e.to_string())
                    .with_source("http_transport"),
            )
        })
    }
}

/// The request URL carries the API key, so it never reaches error text.
fn http_error(e: reqwest::Error) -> Error {
    Error::Transport(TransportError::Http(e.without_url()))
}

/// Prefer `{"error": {"message": ...}}`, fall back to the head of the raw body.
fn remote_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_prefers_provider_error() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(remote_message(body), "Resource has been exhausted");
    }

    #[test]
    fn test_remote_message_truncates_raw_body() {
        let body = "x".repeat(500);
        assert_eq!(remote_message(&body).len(), 200);
    }

    #[tokio::test]
    async fn test_connect_failure_does_not_expose_key() {
        let t = HttpTransport::new(
            "http://127.0.0.1:1",
            Some("SECRET-KEY-123".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = t
            .post_json("/models/m:generateContent", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Http(_))));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{:?}", err).contains("SECRET-KEY-123"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let t = HttpTransport::new("http://localhost:1234/v1beta/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(t.base_url(), "http://localhost:1234/v1beta");
    }
}
