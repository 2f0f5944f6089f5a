//! Transport trait for issuing version requests

#[cfg(test)]
use mockall::automock;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::version::error::FetchError;
use crate::version::request::VersionRequest;

/// Response delivered by a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: StatusCode,
    /// Parsed JSON payload; `None` when the body is not JSON
    pub body: Option<Value>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Self { status, body }
    }
}

/// Trait for performing a single JSON GET request
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request
    ///
    /// # Returns
    /// * `Ok(TransportResponse)` - A response arrived, whatever its status
    /// * `Err(FetchError::Timeout)` - No response within `request.timeout`
    /// * `Err(FetchError::Network)` - The request failed before a response
    async fn get_json(&self, request: &VersionRequest) -> Result<TransportResponse, FetchError>;
}

/// Transport backed by `reqwest`
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("version-check")
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, request: &VersionRequest) -> Result<TransportResponse, FetchError> {
        let response = self
            .client
            .get(&request.url)
            .header("Accept", "application/json")
            .timeout(request.timeout)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_request_error)?;

        let body = serde_json::from_slice(&bytes)
            .inspect_err(|e| debug!("Response from {} is not JSON: {}", request.url, e))
            .ok();

        Ok(TransportResponse::new(status, body))
    }
}

fn map_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e)
    }
}
