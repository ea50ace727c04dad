//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits,
//! so the relay can be exercised end to end without a backend or a model.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketlens_core::testing::{MockGateway, MockLogin, MockOracle};
//!
//! let login = MockLogin::new();
//! let gateway = MockGateway::new();
//! let oracle = MockOracle::new();
//!
//! // Configure mock responses
//! gateway.set_latest_article("100", "Login fails since yesterday");
//!
//! // Build a TicketRelay from them...
//! ```

mod mock_gateway;
mod mock_login;
mod mock_oracle;

pub use mock_gateway::{MockGateway, RecordedUpdate};
pub use mock_login::MockLogin;
pub use mock_oracle::{MockLlmClient, MockOracle};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::config::ZnunyConfig;
    use crate::webhook::WebhookEvent;

    /// Backend config pointing at `base_url` with test credentials.
    pub fn znuny_config(base_url: &str) -> ZnunyConfig {
        ZnunyConfig {
            base_url: base_url.to_string(),
            user: "agent".to_string(),
            password: "secret".to_string(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Article record as the backend returns it.
    pub fn article(id: u64, create_time: &str, body: &str) -> Value {
        json!({
            "ArticleID": id,
            "CreateTime": create_time,
            "Body": body,
        })
    }

    /// `Ticket/{id}?AllArticles=1` response carrying `articles`.
    pub fn ticket_response(ticket_id: u64, articles: Vec<Value>) -> Value {
        json!({
            "Ticket": [{
                "TicketID": ticket_id,
                "Title": "Test ticket",
                "Article": articles,
            }]
        })
    }

    /// Model output in the shape the oracle parses.
    pub fn verdict(type_id: u32, diagnosis: &str) -> String {
        json!({"type_id": type_id, "diagnostico": diagnosis}).to_string()
    }

    /// POST webhook event carrying `json` as its body.
    pub fn webhook_event(json: Value) -> WebhookEvent {
        WebhookEvent::from_json("POST", json)
    }
}
