//! Direct relay invocation (`POST /agent/update`).

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use ticketlens_core::{
    Diagnosis, FailureStage, RelayError, RelayRequest, TicketFieldOverrides, TicketRef,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Update fields accepted by `/agent/update` and read from webhook payloads.
///
/// Every field is optional and a value of the wrong type counts as absent,
/// since webhook senders put arbitrary data under these keys.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
    #[serde(default, deserialize_with = "lenient")]
    pub ticket_id: Option<TicketRef>,
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ticket_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub customer_user: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub queue_id: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub priority_id: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub state_id: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub subject: Option<String>,
    #[serde(default)]
    pub dynamic_fields: Option<Value>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl UpdateBody {
    /// Parse a JSON object body. An empty body is an empty request.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes).map_err(|e| format!("body must be a JSON object: {}", e))
    }

    /// Read update fields from a webhook payload, ignoring anything unusable.
    pub fn from_payload(payload: Option<&Value>) -> Self {
        payload
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn into_request(self) -> RelayRequest {
        RelayRequest {
            ticket: self.ticket_id,
            session_id: self.session_id,
            body: self.body,
            ticket_text: self.ticket_text,
            overrides: TicketFieldOverrides {
                title: self.title,
                customer_user: self.customer_user,
                queue_id: self.queue_id,
                priority_id: self.priority_id,
                state_id: self.state_id,
                subject: self.subject,
                dynamic_fields: self.dynamic_fields.filter(|v| !v.is_null()),
            },
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct RelayErrorResponse {
    pub error: String,
    pub stage: FailureStage,
    pub kind: &'static str,
    /// Diagnosis computed before a failed write-back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
}

/// Map a relay failure to its HTTP response.
pub fn error_response(err: &RelayError) -> (StatusCode, Json<RelayErrorResponse>) {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(RelayErrorResponse {
            error: err.to_string(),
            stage: err.stage(),
            kind: err.kind(),
            diagnosis: err.diagnosis().cloned(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Run the relay for the ticket named in the body.
pub async fn update_with_diagnosis(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = match UpdateBody::from_bytes(&body) {
        Ok(body) => body.into_request(),
        Err(message) => return error_response(&RelayError::Validation(message)).into_response(),
    };

    if let Some(ticket) = &request.ticket {
        info!(ticket_id = %ticket, "Relay requested via /agent/update");
    }

    match state.relay().run(request).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_body_accepts_numeric_and_string_ids() {
        let body = UpdateBody::from_bytes(br#"{"ticket_id": 100}"#).unwrap();
        assert_eq!(body.ticket_id, Some(TicketRef::from(100)));

        let body = UpdateBody::from_bytes(br#"{"ticket_id": "100"}"#).unwrap();
        assert_eq!(body.ticket_id, Some(TicketRef::from(100)));
    }

    #[test]
    fn test_update_body_empty_is_default() {
        let body = UpdateBody::from_bytes(b"").unwrap();
        assert!(body.ticket_id.is_none());
    }

    #[test]
    fn test_update_body_rejects_non_json() {
        assert!(UpdateBody::from_bytes(b"ticket_id=100").is_err());
    }

    #[test]
    fn test_payload_fields_with_wrong_types_are_ignored() {
        let payload = json!({
            "queue_id": "not a number",
            "title": "Printer down",
            "Event": {"TicketID": 5}
        });
        let request = UpdateBody::from_payload(Some(&payload)).into_request();
        assert_eq!(request.overrides.queue_id, None);
        assert_eq!(request.overrides.title.as_deref(), Some("Printer down"));
        assert!(request.ticket.is_none());
    }
}
