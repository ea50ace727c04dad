//! Webhook event and payload schema.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ticketing::TicketRef;

/// A raw inbound webhook request as captured at ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub time: DateTime<Utc>,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// Body parsed as JSON, when it was JSON.
    #[serde(default)]
    pub json: Option<Value>,
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    #[serde(default)]
    pub raw_body: String,
}

impl WebhookEvent {
    /// Event carrying only a JSON body, stamped now.
    pub fn from_json(method: impl Into<String>, json: Value) -> Self {
        Self {
            time: Utc::now(),
            method: method.into(),
            headers: BTreeMap::new(),
            args: BTreeMap::new(),
            raw_body: json.to_string(),
            json: Some(json),
            form: BTreeMap::new(),
        }
    }

    /// Structured view of the JSON body, if it is an object.
    pub fn payload(&self) -> Option<TicketPayload> {
        self.json.as_ref().and_then(TicketPayload::from_json)
    }
}

/// Shape of a logged entry needed for fallback resolution.
///
/// Only the JSON body is read, so entries written by older versions with
/// different metadata fields still resolve.
#[derive(Debug, Deserialize)]
pub(crate) struct LoggedEvent {
    #[serde(default)]
    pub json: Option<Value>,
}

/// Deserialize an optional field, treating a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// `Event` / `Ticket` wrapper objects some senders nest the id in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadWrapper {
    #[serde(rename = "TicketID", default, deserialize_with = "lenient")]
    pub ticket_id: Option<TicketRef>,
    #[serde(rename = "ticket_id", default, deserialize_with = "lenient")]
    pub ticket_id_snake: Option<TicketRef>,
}

impl PayloadWrapper {
    fn ticket_ref(&self) -> Option<&TicketRef> {
        self.ticket_id.as_ref().or(self.ticket_id_snake.as_ref())
    }
}

/// Webhook body fields relevant to ticket resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPayload {
    #[serde(rename = "TicketID", default, deserialize_with = "lenient")]
    pub ticket_id: Option<TicketRef>,
    #[serde(rename = "ticket_id", default, deserialize_with = "lenient")]
    pub ticket_id_snake: Option<TicketRef>,
    #[serde(rename = "Event", default, deserialize_with = "lenient")]
    pub event: Option<PayloadWrapper>,
    #[serde(rename = "Ticket", default, deserialize_with = "lenient")]
    pub ticket: Option<PayloadWrapper>,
    #[serde(rename = "SessionID", default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
}

impl TicketPayload {
    /// Parse a JSON body; non-objects carry no payload.
    pub fn from_json(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Ticket reference by precedence: direct keys, then the `Event`
    /// wrapper, then the `Ticket` wrapper.
    pub fn ticket_ref(&self) -> Option<&TicketRef> {
        self.ticket_id
            .as_ref()
            .or(self.ticket_id_snake.as_ref())
            .or_else(|| self.event.as_ref().and_then(PayloadWrapper::ticket_ref))
            .or_else(|| self.ticket.as_ref().and_then(PayloadWrapper::ticket_ref))
    }

    /// Session token sent along with the event, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }
}
