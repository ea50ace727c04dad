//! Znuny webhook ingress (`/znuny-webhook`).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use ticketlens_core::{RelayError, TicketRef, WebhookEvent};

use super::relay::{error_response, UpdateBody};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub ticket_id: TicketRef,
    pub resolved_from: &'static str,
}

/// Capture the request, resolve its ticket, then run the relay for it.
pub async fn znuny_webhook(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let event = capture_event(&method, &headers, query.as_deref(), &body);

    let resolution = match state.resolver().resolve(&event).await {
        Ok(resolution) => resolution,
        Err(e) => {
            warn!(error = %e, "Webhook without a resolvable ticket");
            return error_response(&RelayError::from(e)).into_response();
        }
    };

    let mut request = UpdateBody::from_payload(event.json.as_ref()).into_request();
    request.ticket = Some(resolution.ticket.clone());
    // A configured token wins over one sent by the backend.
    request.session_id = if state.has_session_override() {
        None
    } else {
        event
            .payload()
            .and_then(|p| p.session_id().map(str::to_string))
    };

    info!(
        ticket_id = %resolution.ticket,
        source = resolution.source.as_str(),
        "Processing webhook"
    );

    match state.relay().run(request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(WebhookResponse {
                status: "ok",
                ticket_id: resolution.ticket,
                resolved_from: resolution.source.as_str(),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// Build the logged event from the raw request parts.
fn capture_event(
    method: &Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> WebhookEvent {
    let raw_body = String::from_utf8_lossy(body).into_owned();
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    WebhookEvent {
        time: Utc::now(),
        method: method.to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        args: parse_pairs(query.unwrap_or_default()),
        json: serde_json::from_slice(body).ok(),
        form: if is_form {
            parse_pairs(&raw_body)
        } else {
            BTreeMap::new()
        },
        raw_body,
    }
}

fn parse_pairs(input: &str) -> BTreeMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(input)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}
