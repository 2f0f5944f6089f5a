//! Fetching ranked lists of preview versions

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::default_versions_to_fetch;
use crate::version::error::FetchError;
use crate::version::request::{FetchOutcome, RequestState, send_request};
use crate::version::selection::merge_versions;
use crate::version::transport::Transport;
use crate::version::types::{SelectionRule, VersionCatalog, VersionDescriptor};

/// Requests the version catalog and extracts the entries callers asked for
#[derive(Clone)]
pub struct VersionListFetcher {
    transport: Arc<dyn Transport>,
    default_rules: Vec<SelectionRule>,
}

impl VersionListFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            default_rules: default_versions_to_fetch(),
        }
    }

    /// Replaces the rules used when a caller passes none
    pub fn with_default_rules(mut self, rules: Vec<SelectionRule>) -> Self {
        self.default_rules = rules;
        self
    }

    /// Fetches the catalog at `url` and merges the entries selected by
    /// `rules` (or the default rules when `None`), in rule order.
    pub async fn fetch(
        &self,
        url: &str,
        rules: Option<&[SelectionRule]>,
    ) -> FetchOutcome<Vec<VersionDescriptor>> {
        info!("Fetching all available versions from {}", url);

        let rules = rules.unwrap_or(self.default_rules.as_slice());

        match send_request::<VersionCatalog>(self.transport.as_ref(), url).await {
            FetchOutcome::Loaded(catalog) => {
                let versions = merge_versions(rules, &catalog);
                info!("Selected {} versions from {}", versions.len(), url);
                FetchOutcome::Loaded(versions)
            }
            FetchOutcome::Failed(e) => {
                match &e {
                    FetchError::Timeout => warn!("Unable to get all versions; timed out"),
                    e => warn!("Unable to get all versions: {}", e),
                }
                FetchOutcome::Failed(e)
            }
            FetchOutcome::Unhandled(status) => FetchOutcome::Unhandled(status),
        }
    }

    /// Callback form of [`fetch`](Self::fetch).
    ///
    /// `on_success` receives the merged list after a 200 response, `on_error`
    /// runs after a timeout or transport failure. Neither runs for any other
    /// status; callers waiting on one must apply their own timeout.
    pub async fn fetch_all_versions<S, E>(
        &self,
        url: &str,
        rules: Option<&[SelectionRule]>,
        on_success: S,
        on_error: E,
    ) -> RequestState
    where
        S: FnOnce(Vec<VersionDescriptor>),
        E: FnOnce(),
    {
        match self.fetch(url, rules).await {
            FetchOutcome::Loaded(versions) => {
                on_success(versions);
                RequestState::Succeeded
            }
            FetchOutcome::Failed(_) => {
                on_error();
                RequestState::Failed
            }
            FetchOutcome::Unhandled(status) => RequestState::Unhandled { status },
        }
    }

    /// Runs [`fetch_all_versions`](Self::fetch_all_versions) on a background
    /// task and returns its handle.
    ///
    /// Dropping the handle does not cancel the request; `abort()` does.
    pub fn spawn_fetch_all_versions<S, E>(
        &self,
        url: String,
        rules: Option<Vec<SelectionRule>>,
        on_success: S,
        on_error: E,
    ) -> JoinHandle<RequestState>
    where
        S: FnOnce(Vec<VersionDescriptor>) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let fetcher = self.clone();
        tokio::spawn(async move {
            fetcher
                .fetch_all_versions(&url, rules.as_deref(), on_success, on_error)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::transport::{MockTransport, TransportResponse};
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    const URL: &str = "https://example.com/versions.json";

    fn catalog_body() -> Value {
        json!({
            "prs": [
                { "version": "pr-1", "timestamp": 10 },
                { "version": "pr-2", "timestamp": 30 },
                { "version": "pr-3", "timestamp": 20 }
            ],
            "branches": [
                { "version": "main-1", "branch": "main" },
                { "version": "master-1", "branch": "master" },
                { "version": "main-2", "branch": "main" }
            ]
        })
    }

    fn fetcher_returning(
        response: Result<TransportResponse, FetchError>,
    ) -> VersionListFetcher {
        let mut transport = MockTransport::new();
        let mut response = Some(response);
        transport
            .expect_get_json()
            .times(1)
            .returning(move |_| response.take().unwrap());
        VersionListFetcher::new(Arc::new(transport))
    }

    fn ok(body: Value) -> Result<TransportResponse, FetchError> {
        Ok(TransportResponse::new(StatusCode::OK, Some(body)))
    }

    fn versions(entries: &[VersionDescriptor]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|e| e.version().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn fetch_all_versions_passes_merged_list_to_on_success() {
        let fetcher = fetcher_returning(ok(catalog_body()));
        let received = Mutex::new(None);
        let rules = [
            SelectionRule::TopPrs(2),
            SelectionRule::Branch("main".to_string()),
        ];

        let state = fetcher
            .fetch_all_versions(
                URL,
                Some(&rules[..]),
                |list| *received.lock().unwrap() = Some(versions(&list)),
                || panic!("on_error must not run"),
            )
            .await;

        assert_eq!(state, RequestState::Succeeded);
        assert_eq!(
            received.into_inner().unwrap(),
            Some(vec![
                "pr-2".to_string(),
                "pr-3".to_string(),
                "main-1".to_string(),
                "main-2".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn fetch_all_versions_uses_default_rules_when_none_given() {
        let fetcher = fetcher_returning(ok(catalog_body()));

        let outcome = fetcher.fetch(URL, None).await;

        let FetchOutcome::Loaded(list) = outcome else {
            panic!("expected loaded outcome");
        };
        assert_eq!(versions(&list), vec!["pr-2", "pr-3", "pr-1", "master-1"]);
    }

    #[tokio::test]
    async fn fetch_all_versions_uses_configured_default_rules() {
        let fetcher = fetcher_returning(ok(catalog_body()))
            .with_default_rules(vec![SelectionRule::Branch("main".to_string())]);

        let outcome = fetcher.fetch(URL, None).await;

        let FetchOutcome::Loaded(list) = outcome else {
            panic!("expected loaded outcome");
        };
        assert_eq!(versions(&list), vec!["main-1", "main-2"]);
    }

    #[tokio::test]
    async fn fetch_all_versions_with_empty_rules_returns_empty_list() {
        let fetcher = fetcher_returning(ok(catalog_body()));
        let received = Mutex::new(None);

        let state = fetcher
            .fetch_all_versions(
                URL,
                Some(&[][..]),
                |list| *received.lock().unwrap() = Some(list),
                || panic!("on_error must not run"),
            )
            .await;

        assert_eq!(state, RequestState::Succeeded);
        assert_eq!(received.into_inner().unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn fetch_all_versions_calls_on_error_on_timeout() {
        let fetcher = fetcher_returning(Err(FetchError::Timeout));
        let errored = Mutex::new(false);

        let state = fetcher
            .fetch_all_versions(
                URL,
                None,
                |_| panic!("on_success must not run"),
                || *errored.lock().unwrap() = true,
            )
            .await;

        assert_eq!(state, RequestState::Failed);
        assert!(errored.into_inner().unwrap());
    }

    #[tokio::test]
    async fn fetch_all_versions_calls_on_error_on_invalid_payload() {
        let fetcher = fetcher_returning(ok(json!({ "prs": "not a list" })));
        let errored = Mutex::new(false);

        let state = fetcher
            .fetch_all_versions(
                URL,
                None,
                |_| panic!("on_success must not run"),
                || *errored.lock().unwrap() = true,
            )
            .await;

        assert_eq!(state, RequestState::Failed);
        assert!(errored.into_inner().unwrap());
    }

    #[tokio::test]
    async fn fetch_all_versions_runs_no_callback_for_non_ok_status() {
        let fetcher = fetcher_returning(Ok(TransportResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            Some(catalog_body()),
        )));

        let state = fetcher
            .fetch_all_versions(
                URL,
                None,
                |_| panic!("on_success must not run"),
                || panic!("on_error must not run"),
            )
            .await;

        assert_eq!(
            state,
            RequestState::Unhandled {
                status: StatusCode::INTERNAL_SERVER_ERROR
            }
        );
    }

    #[tokio::test]
    async fn spawn_fetch_all_versions_returns_handle_to_in_flight_request() {
        let fetcher = fetcher_returning(ok(catalog_body()));
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = fetcher.spawn_fetch_all_versions(
            URL.to_string(),
            Some(vec![SelectionRule::TopPrs(1)]),
            move |list| {
                let _ = tx.send(versions(&list));
            },
            || panic!("on_error must not run"),
        );

        assert_eq!(handle.await.unwrap(), RequestState::Succeeded);
        assert_eq!(rx.await.unwrap(), vec!["pr-2"]);
    }
}
