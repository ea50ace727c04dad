//! Mock ticketing gateway for testing.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::session::Session;
use crate::ticketing::{GatewayError, TicketRef, TicketUpdate, TicketingGateway, UpdateOutcome};

/// A recorded write-back for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpdate {
    pub ticket: TicketRef,
    /// Token of the session the write was issued with.
    pub session_token: String,
    pub update: TicketUpdate,
}

/// Mock implementation of the TicketingGateway trait.
///
/// Provides controllable behavior for testing:
/// - Latest article body per ticket
/// - Recorded fetches and updates
/// - One-shot fetch/update failures
/// - Canned update responses, including backend error objects
///
/// # Example
///
/// ```rust,ignore
/// use ticketlens_core::testing::MockGateway;
///
/// let gateway = MockGateway::new();
/// gateway.set_latest_article("100", "Login fails since yesterday");
///
/// // ... run the relay ...
///
/// let updates = gateway.updates();
/// assert_eq!(updates.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockGateway {
    articles: Mutex<HashMap<String, String>>,
    fetches: Mutex<Vec<TicketRef>>,
    updates: Mutex<Vec<RecordedUpdate>>,
    next_fetch_error: Mutex<Option<GatewayError>>,
    next_update_error: Mutex<Option<GatewayError>>,
    update_response: Mutex<Option<Value>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the latest article body returned for `ticket`.
    pub fn set_latest_article(&self, ticket: &str, body: &str) {
        self.articles
            .lock()
            .unwrap()
            .insert(ticket.to_string(), body.to_string());
    }

    /// Fail the next fetch with `error`.
    pub fn fail_next_fetch(&self, error: GatewayError) {
        *self.next_fetch_error.lock().unwrap() = Some(error);
    }

    /// Fail the next update with `error`.
    pub fn fail_next_update(&self, error: GatewayError) {
        *self.next_update_error.lock().unwrap() = Some(error);
    }

    /// Respond to every update with `response` instead of the default.
    pub fn set_update_response(&self, response: Value) {
        *self.update_response.lock().unwrap() = Some(response);
    }

    /// Tickets whose latest article was requested, in call order.
    pub fn fetches(&self) -> Vec<TicketRef> {
        self.fetches.lock().unwrap().clone()
    }

    /// Updates applied, in call order.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl TicketingGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_latest_article(
        &self,
        ticket: &TicketRef,
        _session: &Session,
    ) -> Result<Option<String>, GatewayError> {
        self.fetches.lock().unwrap().push(ticket.clone());

        if let Some(error) = self.next_fetch_error.lock().unwrap().take() {
            return Err(error);
        }

        Ok(self.articles.lock().unwrap().get(ticket.as_str()).cloned())
    }

    async fn apply_update(
        &self,
        ticket: &TicketRef,
        session: &Session,
        update: &TicketUpdate,
    ) -> Result<UpdateOutcome, GatewayError> {
        if let Some(error) = self.next_update_error.lock().unwrap().take() {
            return Err(error);
        }

        let mut updates = self.updates.lock().unwrap();
        updates.push(RecordedUpdate {
            ticket: ticket.clone(),
            session_token: session.token().to_string(),
            update: update.clone(),
        });

        let response = self
            .update_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| json!({"TicketID": ticket.to_json(), "ArticleID": updates.len()}));

        Ok(UpdateOutcome { response })
    }
}
