//! Checking the latest published version

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::version::error::FetchError;
use crate::version::request::{FetchOutcome, RequestState, send_request};
use crate::version::store::{VersionSlot, VersionStore};
use crate::version::transport::Transport;
use crate::version::types::LatestVersionResponse;

/// Requests the latest version and records it in a [`VersionStore`]
pub struct LatestVersionChecker<S: VersionSlot> {
    transport: Arc<dyn Transport>,
    store: Arc<VersionStore<S>>,
}

impl<S: VersionSlot> Clone for LatestVersionChecker<S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: VersionSlot> LatestVersionChecker<S> {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<VersionStore<S>>) -> Self {
        Self { transport, store }
    }

    /// Fetches `{ "version": ... }` from `url`.
    ///
    /// - 200: updated := version, then `callback(Some(version))`.
    /// - Timeout, transport failure or unreadable payload: `callback(None)`,
    ///   then updated := current, so no update is reported.
    /// - Any other status: no callback and the store is left untouched.
    pub async fn fetch_latest_version<F>(&self, url: &str, callback: F) -> RequestState
    where
        F: FnOnce(Option<String>),
    {
        info!("Fetching new version from {}", url);

        match send_request::<LatestVersionResponse>(self.transport.as_ref(), url).await {
            FetchOutcome::Loaded(response) => {
                info!("Server reports version {}", response.version);
                let _ = self
                    .store
                    .set_updated(Some(response.version.clone()))
                    .inspect_err(|e| warn!("Failed to record updated version: {}", e));
                callback(Some(response.version));
                RequestState::Succeeded
            }
            FetchOutcome::Failed(e) => {
                match &e {
                    FetchError::Timeout => warn!("Unable to check version; timed out"),
                    e => warn!("Unable to check version: {}", e),
                }
                callback(None);
                self.reset_updated();
                RequestState::Failed
            }
            FetchOutcome::Unhandled(status) => RequestState::Unhandled { status },
        }
    }

    /// Runs [`fetch_latest_version`](Self::fetch_latest_version) on a
    /// background task and returns its handle.
    ///
    /// Dropping the handle does not cancel the request; `abort()` does.
    pub fn spawn_fetch_latest_version<F>(&self, url: String, callback: F) -> JoinHandle<RequestState>
    where
        F: FnOnce(Option<String>) + Send + 'static,
    {
        let checker = self.clone();
        tokio::spawn(async move { checker.fetch_latest_version(&url, callback).await })
    }

    /// updated := current
    fn reset_updated(&self) {
        let current = self
            .store
            .current()
            .inspect_err(|e| warn!("Failed to read current version: {}", e))
            .unwrap_or(None);

        let _ = self
            .store
            .set_updated(current)
            .inspect_err(|e| warn!("Failed to record updated version: {}", e));
    }
}
