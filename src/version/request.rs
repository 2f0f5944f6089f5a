//! Construction of version requests

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::FETCH_TIMEOUT_MS;
use crate::version::error::FetchError;
use crate::version::transport::Transport;

/// Result of one version request
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// HTTP 200 with a payload of the expected shape
    Loaded(T),
    /// Timeout, transport failure or an unreadable 200 payload
    Failed(FetchError),
    /// Any other status. No callback fires for this outcome.
    Unhandled(StatusCode),
}

/// What a finished request did, as seen by whoever holds its handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// The success callback ran
    Succeeded,
    /// The failure callback ran
    Failed,
    /// A non-200 status arrived and no callback ran
    Unhandled { status: StatusCode },
}

/// A GET request ready to hand to a [`Transport`](crate::version::transport::Transport)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequest {
    pub url: String,
    pub timeout: Duration,
}

impl VersionRequest {
    /// Builds a request for `url` with a cache-busting timestamp and the
    /// fixed request timeout.
    pub fn new(url: &str) -> Self {
        Self::at(url, chrono::Utc::now().timestamp_millis())
    }

    fn at(url: &str, now_ms: i64) -> Self {
        let url = cache_busted_url(url, now_ms);
        debug!("Built version request for {}", url);
        Self {
            url,
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }
}

/// Issues a GET for `url` and decodes a 200 payload as `T`
pub async fn send_request<T: DeserializeOwned>(
    transport: &dyn Transport,
    url: &str,
) -> FetchOutcome<T> {
    let request = VersionRequest::new(url);

    let response = match transport.get_json(&request).await {
        Ok(response) => response,
        Err(e) => return FetchOutcome::Failed(e),
    };

    if response.status != StatusCode::OK {
        debug!("Ignoring status {} from {}", response.status, request.url);
        return FetchOutcome::Unhandled(response.status);
    }

    let Some(body) = response.body else {
        return FetchOutcome::Failed(FetchError::InvalidResponse(
            "response is not JSON".to_string(),
        ));
    };

    match serde_json::from_value(body) {
        Ok(value) => FetchOutcome::Loaded(value),
        Err(e) => FetchOutcome::Failed(FetchError::InvalidResponse(e.to_string())),
    }
}

/// Appends `?<now_ms>`, or `&<now_ms>` when the URL already has a query
fn cache_busted_url(url: &str, now_ms: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{now_ms}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::transport::{MockTransport, TransportResponse};
    use crate::version::types::LatestVersionResponse;
    use serde_json::json;

    fn transport_returning(status: StatusCode, body: Option<serde_json::Value>) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_get_json()
            .times(1)
            .returning(move |_| Ok(TransportResponse::new(status, body.clone())));
        transport
    }

    #[tokio::test]
    async fn send_request_decodes_ok_payload() {
        let transport = transport_returning(StatusCode::OK, Some(json!({ "version": "v7" })));

        let outcome: FetchOutcome<LatestVersionResponse> =
            send_request(&transport, "https://example.com/version.json").await;

        assert!(matches!(outcome, FetchOutcome::Loaded(r) if r.version == "v7"));
    }

    #[tokio::test]
    async fn send_request_busts_cache_and_sets_timeout() {
        let mut transport = MockTransport::new();
        transport
            .expect_get_json()
            .withf(|request| {
                request.url.starts_with("https://example.com/version.json?")
                    && request.timeout == Duration::from_millis(FETCH_TIMEOUT_MS)
            })
            .times(1)
            .returning(|_| Err(FetchError::Timeout));

        let outcome: FetchOutcome<LatestVersionResponse> =
            send_request(&transport, "https://example.com/version.json").await;

        assert!(matches!(outcome, FetchOutcome::Failed(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn send_request_reports_other_statuses_as_unhandled() {
        let transport = transport_returning(StatusCode::NOT_FOUND, Some(json!({ "version": "v7" })));

        let outcome: FetchOutcome<LatestVersionResponse> =
            send_request(&transport, "https://example.com/version.json").await;

        assert!(matches!(outcome, FetchOutcome::Unhandled(StatusCode::NOT_FOUND)));
    }

    #[tokio::test]
    async fn send_request_fails_on_non_json_ok_payload() {
        let transport = transport_returning(StatusCode::OK, None);

        let outcome: FetchOutcome<LatestVersionResponse> =
            send_request(&transport, "https://example.com/version.json").await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn send_request_fails_on_unexpected_payload_shape() {
        let transport = transport_returning(StatusCode::OK, Some(json!({ "version": 7 })));

        let outcome: FetchOutcome<LatestVersionResponse> =
            send_request(&transport, "https://example.com/version.json").await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn cache_busted_url_appends_timestamp_as_query() {
        assert_eq!(
            cache_busted_url("https://example.com/version.json", 1_700_000_000_000),
            "https://example.com/version.json?1700000000000"
        );
    }

    #[test]
    fn cache_busted_url_extends_existing_query() {
        assert_eq!(
            cache_busted_url("https://example.com/version.json?channel=beta", 42),
            "https://example.com/version.json?channel=beta&42"
        );
    }

    #[test]
    fn version_request_uses_four_second_timeout() {
        let request = VersionRequest::at("https://example.com/v", 1);

        assert_eq!(request.timeout, Duration::from_secs(4));
        assert_eq!(request.url, "https://example.com/v?1");
    }

    #[test]
    fn version_request_new_busts_cache_with_current_time() {
        let before = chrono::Utc::now().timestamp_millis();
        let request = VersionRequest::new("https://example.com/v");
        let after = chrono::Utc::now().timestamp_millis();

        let stamp: i64 = request
            .url
            .strip_prefix("https://example.com/v?")
            .unwrap()
            .parse()
            .unwrap();
        assert!((before..=after).contains(&stamp));
    }
}
