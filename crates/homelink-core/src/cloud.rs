//! HTTP client for the vendor cloud API.
//!
//! Implements [`CloudTransport`] over reqwest. Every response carries a JSON
//! envelope `{ "statusCode": n, "message": "...", "body": { ... } }`; the
//! envelope code drives classification, with the HTTP status as a fallback
//! when the body is not an envelope.
//!
//! # Example
//!
//! ```no_run
//! use homelink_core::cloud::CloudClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CloudClient::new("https://api.example-vendor.com")?
//!     .with_token("secret-token");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::{CloudCommand, CloudResponse, CloudTransport};

/// HTTP client for the vendor cloud API.
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl CloudClient {
    /// Create a new cloud client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API base URL (e.g., "https://api.example-vendor.com")
    pub fn new(base_url: &str) -> Result<Self> {
        // Normalize URL (remove trailing slash)
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::invalid_config(format!(
                "URL must start with http:// or https://, got: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::invalid_config(format!(
                "URL must start with http:// or https://, got: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Attach an API token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", token),
            None => request,
        }
    }

    /// Unpack a response into the envelope's status code and inner body.
    /// A non-envelope body falls back to the HTTP status code.
    async fn unpack(response: reqwest::Response) -> Result<CloudResponse> {
        let http_status = i64::from(response.status().as_u16());
        let value: Value = response.json().await.unwrap_or(Value::Null);

        let status_code = value
            .get("statusCode")
            .and_then(Value::as_i64)
            .unwrap_or(http_status);
        let body = value.get("body").cloned().unwrap_or(Value::Null);

        Ok(CloudResponse { status_code, body })
    }
}

#[async_trait]
impl CloudTransport for CloudClient {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn get_status(&self, device_id: &str) -> Result<CloudResponse> {
        let url = format!("{}/v1.1/devices/{}/status", self.base_url, device_id);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::unpack(response).await
    }

    async fn control_device(&self, device_id: &str, command: &CloudCommand) -> Result<CloudResponse> {
        let url = format!("{}/v1.1/devices/{}/commands", self.base_url, device_id);
        let response = self
            .authorize(self.client.post(&url))
            .json(command)
            .send()
            .await?;
        Self::unpack(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CloudClient::new("https://api.example-vendor.com");
        assert!(client.is_ok());
        assert_eq!(
            client.unwrap().base_url(),
            "https://api.example-vendor.com"
        );
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = CloudClient::new("https://api.example-vendor.com/").unwrap();
        assert_eq!(client.base_url(), "https://api.example-vendor.com");
    }

    #[test]
    fn test_client_invalid_url() {
        let result = CloudClient::new("api.example-vendor.com");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_authentication_requires_token() {
        let client = CloudClient::new("https://api.example-vendor.com").unwrap();
        assert!(!client.is_authenticated());
        let client = client.with_token("secret");
        assert!(client.is_authenticated());
    }
}
