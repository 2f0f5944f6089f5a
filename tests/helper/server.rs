//! HTTP server test utilities

use std::sync::Arc;

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::Value;

use version_check::version::transport::{HttpTransport, Transport};

/// Serves `body` as JSON at `path` with `status`, whatever the cache-busting query
pub async fn serve_json(server: &mut ServerGuard, path: &str, status: usize, body: &Value) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

pub fn http_transport() -> Arc<dyn Transport> {
    Arc::new(HttpTransport::new().unwrap())
}

/// URL on a local port nothing listens on
pub fn unreachable_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{path}")
}
