//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, so the HTTP surface can be exercised
//! without a ticketing backend or a diagnosis model.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ticketlens_core::{
    testing::{MockGateway, MockLogin, MockOracle},
    Config, DiagnosisOracle, EventLog, ServerConfig, SessionCache, TicketRelay, UpdateDefaults,
    WebhookConfig, WebhookResolver, ZnunyConfig,
};

/// Re-export fixtures for test convenience
pub use ticketlens_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Backend login (MockLogin)
/// - Ticket reads and writes (MockGateway)
/// - Diagnosis (MockOracle)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_update() {
///     let fixture = TestFixture::new().await;
///     fixture.gateway.set_latest_article("100", "Login fails");
///
///     let response = fixture.post("/agent/update", json!({"ticket_id": 100})).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock login - count logins, inject failures
    pub login: Arc<MockLogin>,
    /// Mock gateway - configure articles, inspect writes
    pub gateway: Arc<MockGateway>,
    /// Mock oracle - configure diagnoses
    pub oracle: Arc<MockOracle>,
    /// Temporary directory holding the webhook event log
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Build the relay without a diagnosis oracle
    pub without_oracle: bool,
    /// Configured session token override
    pub session_override: Option<String>,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        // Create mocks
        let login = Arc::new(MockLogin::new());
        let gateway = Arc::new(MockGateway::new());
        let oracle = Arc::new(MockOracle::new());

        // Create config
        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            znuny: ZnunyConfig {
                user: "agent".to_string(),
                password: "secret".to_string(),
                session_id: test_config.session_override.clone(),
                ..Default::default()
            },
            webhook: WebhookConfig {
                log_path: temp_dir.path().join("znuny_requests.log"),
                ..Default::default()
            },
            ..Default::default()
        };

        let sessions = SessionCache::new(
            Arc::clone(&login) as Arc<dyn ticketlens_core::SessionLogin>,
            Duration::from_secs(config.znuny.session_ttl_secs),
        )
        .with_override(config.znuny.session_id.clone());

        let oracle_dep = if test_config.without_oracle {
            None
        } else {
            Some(Arc::clone(&oracle) as Arc<dyn DiagnosisOracle>)
        };

        let relay = Arc::new(TicketRelay::new(
            Arc::new(sessions),
            Arc::clone(&gateway) as Arc<dyn ticketlens_core::TicketingGateway>,
            oracle_dep,
            UpdateDefaults::default(),
        ));

        let resolver = Arc::new(WebhookResolver::new(
            EventLog::new(config.webhook.log_path.clone(), config.webhook.max_log_bytes),
            config.webhook.max_scan_entries,
        ));

        // Create app state with mocks
        let state = Arc::new(ticketlens_server::state::AppState::new(
            config, relay, resolver,
        ));

        // Create router
        let router = ticketlens_server::api::create_router(state);

        Self {
            router,
            login,
            gateway,
            oracle,
            temp_dir,
        }
    }

    /// Path of the webhook event log.
    pub fn event_log_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("znuny_requests.log")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request_raw("POST", path, body, "application/json").await
    }

    /// Send a POST request with custom content type.
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        self.request_raw("POST", path, body, content_type).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request with raw string body and custom content type.
    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
