//! Ticket reference resolution for webhook events.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::WEBHOOK_RESOLUTIONS;
use crate::ticketing::TicketRef;

use super::types::LoggedEvent;
use super::{EventLog, TicketPayload, WebhookEvent};

/// Failure to determine the ticket an event refers to. Terminal for the event.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("No ticket reference in payload or in the last {scanned} logged events")]
    NotFound { scanned: usize },
}

/// Where a resolved reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Payload,
    EventLog,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Payload => "payload",
            ResolutionSource::EventLog => "event_log",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ticket: TicketRef,
    pub source: ResolutionSource,
}

/// Resolves the target ticket of webhook events, recording every event first.
pub struct WebhookResolver {
    log: EventLog,
    max_scan_entries: usize,
}

impl WebhookResolver {
    pub fn new(log: EventLog, max_scan_entries: usize) -> Self {
        Self {
            log,
            max_scan_entries,
        }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Persist the event. Failures are logged and otherwise ignored.
    pub async fn record(&self, event: &WebhookEvent) {
        if let Err(e) = self.log.append(event).await {
            warn!(path = %self.log.path().display(), error = %e, "Failed to record webhook event");
        }
    }

    /// Record the event, then resolve its ticket reference: payload fields
    /// first, then the most recent logged event that carries one.
    pub async fn resolve(&self, event: &WebhookEvent) -> Result<Resolution, ResolutionError> {
        self.record(event).await;

        if let Some(ticket) = event.payload().as_ref().and_then(TicketPayload::ticket_ref) {
            WEBHOOK_RESOLUTIONS.with_label_values(&["payload"]).inc();
            return Ok(Resolution {
                ticket: ticket.clone(),
                source: ResolutionSource::Payload,
            });
        }

        debug!("No ticket reference in webhook payload, scanning event log");
        let (found, scanned) = self.scan_log().await;
        match found {
            Some(ticket) => {
                info!(ticket_id = %ticket, scanned, "Resolved ticket from event log");
                WEBHOOK_RESOLUTIONS.with_label_values(&["event_log"]).inc();
                Ok(Resolution {
                    ticket,
                    source: ResolutionSource::EventLog,
                })
            }
            None => {
                WEBHOOK_RESOLUTIONS.with_label_values(&["unresolved"]).inc();
                Err(ResolutionError::NotFound { scanned })
            }
        }
    }

    /// Scan logged events most-recent-first. Malformed records are skipped.
    async fn scan_log(&self) -> (Option<TicketRef>, usize) {
        let records = match self.log.recent_records(self.max_scan_entries).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to read webhook event log");
                return (None, 0);
            }
        };

        for (index, record) in records.iter().enumerate() {
            let logged: LoggedEvent = match serde_json::from_str(record) {
                Ok(logged) => logged,
                Err(e) => {
                    debug!(index, error = %e, "Skipping malformed event log record");
                    continue;
                }
            };
            let ticket = logged
                .json
                .as_ref()
                .and_then(TicketPayload::from_json)
                .and_then(|p| p.ticket_ref().cloned());
            if let Some(ticket) = ticket {
                return (Some(ticket), index + 1);
            }
        }

        (None, records.len())
    }
}
