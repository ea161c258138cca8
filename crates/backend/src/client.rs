//! Shared HTTP plumbing for the backend API.

use serde::de::DeserializeOwned;

/// HTTP client for one backend deployment.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `https://studio.example/api`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across gateways).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Base HTTP URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a path onto the base URL.
    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Check the status and deserialize the JSON body.
    pub(crate) async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_duplicate_slashes() {
        let client = ApiClient::new("https://studio.example/api/".to_string());
        assert_eq!(
            client.url("/moodboard-item-versions/7"),
            "https://studio.example/api/moodboard-item-versions/7"
        );
    }

    #[test]
    fn url_joins_bare_segments() {
        let client = ApiClient::new("https://studio.example/api".to_string());
        assert_eq!(
            client.url("credits/balance"),
            "https://studio.example/api/credits/balance"
        );
    }
}
