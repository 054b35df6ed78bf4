//! Stand-ins for the chat / overlay / tweet scripts and the encoder's file.

use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock server answering 200 on `/chat`, `/gfx` and `/tweet`.
pub async fn start_endpoints() -> MockServer {
    let server = MockServer::start().await;
    for route in ["/chat", "/gfx", "/tweet"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }
    server
}

/// Request targets (`/path?query`, query left percent-encoded) in sorted order.
pub async fn request_targets(server: &MockServer) -> Vec<String> {
    let mut targets: Vec<String> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| match r.url.query() {
            Some(q) => format!("{}?{}", r.url.path(), q),
            None => r.url.path().to_string(),
        })
        .collect();
    targets.sort();
    targets
}

/// Wait until at least `n` requests arrived, or give up after two seconds.
pub async fn wait_for_requests(server: &MockServer, n: usize) -> Vec<String> {
    for _ in 0..100 {
        let targets = request_targets(server).await;
        if targets.len() >= n {
            return targets;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    request_targets(server).await
}

/// Wait until `path` holds exactly `expected`; returns whatever it holds last.
pub async fn wait_for_file(path: &Path, expected: &str) -> Option<String> {
    for _ in 0..100 {
        if let Ok(s) = std::fs::read_to_string(path) {
            if s == expected {
                return Some(s);
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    std::fs::read_to_string(path).ok()
}
