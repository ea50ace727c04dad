//! Types for the ticket relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::oracle::{Diagnosis, OracleError};
use crate::session::SessionError;
use crate::ticketing::{GatewayError, TicketFieldOverrides, TicketRef};
use crate::webhook::ResolutionError;

/// One relay invocation.
#[derive(Debug, Clone, Default)]
pub struct RelayRequest {
    /// Target ticket. Required; `None` fails validation.
    pub ticket: Option<TicketRef>,
    /// Caller-supplied session token. Used verbatim, never validated eagerly.
    pub session_id: Option<String>,
    /// Explicit article body. Skips diagnosis entirely.
    pub body: Option<String>,
    /// Explicit text to diagnose instead of the latest article.
    pub ticket_text: Option<String>,
    /// Ticket field overrides merged over the configured defaults.
    pub overrides: TicketFieldOverrides,
}

impl RelayRequest {
    pub fn new(ticket: TicketRef) -> Self {
        Self {
            ticket: Some(ticket),
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_ticket_text(mut self, text: impl Into<String>) -> Self {
        self.ticket_text = Some(text.into());
        self
    }

    pub fn with_overrides(mut self, overrides: TicketFieldOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Successful relay run.
#[derive(Debug, Clone, Serialize)]
pub struct RelayOutcome {
    pub ok: bool,
    pub ticket_id: TicketRef,
    /// Article body that was written: the diagnosis text or the explicit body.
    pub diagnosis: String,
    /// Ticket type written back, absent when an explicit body was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u32>,
    /// Raw backend response to the write-back.
    pub response: Value,
}

/// Where the article body came from.
#[derive(Debug, Clone)]
pub(crate) enum Content {
    /// Caller supplied the body; written verbatim.
    Explicit(String),
    /// Text to diagnose.
    Diagnose(String),
}

/// Progress through a run. Linear; `Aborted` is reached through `RelayError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    SessionAcquired,
    ContentReady,
    Diagnosed,
    Updated,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::SessionAcquired => "session_acquired",
            PipelineStage::ContentReady => "content_ready",
            PipelineStage::Diagnosed => "diagnosed",
            PipelineStage::Updated => "updated",
        }
    }
}

/// Stage at which a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validation,
    Resolution,
    Session,
    Content,
    Diagnosis,
    WriteBack,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Validation => "validation",
            FailureStage::Resolution => "resolution",
            FailureStage::Session => "session",
            FailureStage::Content => "content",
            FailureStage::Diagnosis => "diagnosis",
            FailureStage::WriteBack => "write_back",
        }
    }
}

/// Relay failure, one variant per failure class.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("No content to diagnose and no body supplied for ticket {ticket}")]
    ContentUnavailable { ticket: TicketRef },

    #[error("Failed to read ticket {ticket}: {source}")]
    ContentFetch {
        ticket: TicketRef,
        #[source]
        source: GatewayError,
    },

    #[error("Diagnosis failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Write-back to ticket {ticket} failed: {source}")]
    BackendWrite {
        ticket: TicketRef,
        #[source]
        source: GatewayError,
        /// Diagnosis computed before the write failed, for retrying the write.
        diagnosis: Option<Diagnosis>,
    },

    #[error("Ticket reference not resolvable: {0}")]
    Resolution(#[from] ResolutionError),
}

impl RelayError {
    pub fn stage(&self) -> FailureStage {
        match self {
            RelayError::Validation(_) => FailureStage::Validation,
            RelayError::Session(_) => FailureStage::Session,
            RelayError::ContentUnavailable { .. } | RelayError::ContentFetch { .. } => {
                FailureStage::Content
            }
            RelayError::Oracle(_) => FailureStage::Diagnosis,
            RelayError::BackendWrite { .. } => FailureStage::WriteBack,
            RelayError::Resolution(_) => FailureStage::Resolution,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "validation_error",
            RelayError::Session(_) => "session_error",
            RelayError::ContentUnavailable { .. } => "content_unavailable",
            RelayError::ContentFetch { .. } => "content_fetch_error",
            RelayError::Oracle(_) => "oracle_error",
            RelayError::BackendWrite { .. } => "backend_write_error",
            RelayError::Resolution(_) => "resolution_error",
        }
    }

    /// Diagnosis preserved by a failed write-back.
    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        match self {
            RelayError::BackendWrite { diagnosis, .. } => diagnosis.as_ref(),
            _ => None,
        }
    }

    /// Whether the caller's input was at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::Validation(_) | RelayError::Resolution(_))
    }
}
