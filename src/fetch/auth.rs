use crate::error::{PipelineError, Result};
use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// The header name and value are validated once at construction so that
/// request execution never has to fail on a malformed key.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .map_err(|e| PipelineError::Config(format!("invalid header name '{header_name}': {e}")))?;
        let mut value = HeaderValue::from_str(key)
            .map_err(|e| PipelineError::Config(format!("invalid API key header value: {e}")))?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Uses `Authorization: Bearer <key>`.
    pub fn bearer(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, "Authorization", &format!("Bearer {key}"))
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_bearer_accepts_plain_key() {
        assert!(ApiKey::bearer(BasicClient::new(), "abc123").is_ok());
    }

    #[test]
    fn test_rejects_invalid_header_name() {
        let result = ApiKey::new(BasicClient::new(), "bad header", "k");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_rejects_control_characters_in_key() {
        let result = ApiKey::bearer(BasicClient::new(), "line\nbreak");
        assert!(result.is_err());
    }
}
