//! HTTP client abstraction for testability

use async_trait::async_trait;

use super::TileError;

/// Trait for HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    async fn get(&self, url: &str) -> Result<Vec<u8>, TileError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the default 30 second timeout.
    pub fn new() -> Result<Self, TileError> {
        Self::with_timeout(30)
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, TileError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TileError::Http {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TileError> {
        let response = self.client.get(url).send().await.map_err(|e| TileError::Http {
            url: url.to_string(),
            reason: format!("Request failed: {}", e),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TileError::Http {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TileError::Http {
                url: url.to_string(),
                reason: format!("Failed to read response: {}", e),
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Mock HTTP client for testing.
    ///
    /// Returns the configured body for every request, or an HTTP error
    /// with the configured status text.
    pub struct MockHttpClient {
        pub body: Option<Vec<u8>>,
        pub error_reason: Option<String>,
    }

    impl MockHttpClient {
        pub fn with_body(body: Vec<u8>) -> Self {
            Self {
                body: Some(body),
                error_reason: None,
            }
        }

        pub fn with_error(reason: &str) -> Self {
            Self {
                body: None,
                error_reason: Some(reason.to_string()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, TileError> {
            if let Some(reason) = &self.error_reason {
                return Err(TileError::Http {
                    url: url.to_string(),
                    reason: reason.clone(),
                });
            }
            Ok(self.body.clone().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockHttpClient::with_body(vec![1, 2, 3, 4]);
        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockHttpClient::with_error("HTTP 500");
        let result = mock.get("http://example.com").await;
        assert!(matches!(result, Err(TileError::Http { .. })));
    }
}
