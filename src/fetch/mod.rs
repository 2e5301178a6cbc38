//! HTTP retrieval of raw geodata documents.
//!
//! The fetch layer only moves bytes and the status code; deciding whether a
//! response is usable belongs to the extract stage.

mod auth;
mod basic;
mod client;

pub use auth::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Status code and body of a fetched document.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Wraps bytes that were read locally rather than over HTTP.
    pub fn from_local(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}

/// Issues a GET for `url` and returns the response regardless of status.
pub async fn fetch_response(client: &dyn HttpClient, url: &str) -> Result<RawResponse> {
    let url = reqwest::Url::parse(url)
        .map_err(|e| PipelineError::Config(format!("invalid URL '{url}': {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await?.to_vec();

    debug!(status, bytes = body.len(), "Fetched response");
    Ok(RawResponse { status, body })
}

/// Loads a document from a local path, or fetches it when `location` is an
/// `http(s)` URL.
pub async fn load_document(client: &dyn HttpClient, location: &str) -> Result<RawResponse> {
    if location.starts_with("http://") || location.starts_with("https://") {
        fetch_response(client, location).await
    } else {
        Ok(RawResponse::from_local(std::fs::read(location)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every request with a canned response and remembers headers.
    struct StubClient {
        status: u16,
        body: &'static str,
        seen_auth: Mutex<Option<String>>,
    }

    impl StubClient {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen_auth: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let auth = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            *self.seen_auth.lock().unwrap() = auth;

            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body)
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    #[tokio::test]
    async fn test_fetch_response_keeps_status_and_body() {
        let client = StubClient::new(200, r#"{"elements":[]}"#);
        let resp = fetch_response(&client, "https://example.org/api").await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.text(), r#"{"elements":[]}"#);
        assert!(resp.json().unwrap()["elements"].is_array());
    }

    #[tokio::test]
    async fn test_fetch_response_does_not_fail_on_error_status() {
        let client = StubClient::new(429, "rate limited");
        let resp = fetch_response(&client, "https://example.org/api").await.unwrap();

        assert_eq!(resp.status, 429);
        assert_eq!(resp.text(), "rate limited");
    }

    #[tokio::test]
    async fn test_api_key_wrapper_sets_bearer_header() {
        let client = ApiKey::bearer(StubClient::new(200, "{}"), "secret").unwrap();
        fetch_response(&client, "https://example.org/api").await.unwrap();

        let seen = client_inner_auth(&client);
        assert_eq!(seen.as_deref(), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let client = StubClient::new(200, "{}");
        let result = fetch_response(&client, "not a url").await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_document_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geo.json");
        std::fs::write(&path, r#"{"elements":[1]}"#).unwrap();

        let client = StubClient::new(500, "unused");
        let resp = load_document(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.json().unwrap()["elements"][0], 1);
    }

    fn client_inner_auth(client: &ApiKey<StubClient>) -> Option<String> {
        client.inner().seen_auth.lock().unwrap().clone()
    }
}
