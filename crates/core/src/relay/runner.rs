//! Ticket relay implementation.
//!
//! One linear run per call:
//! session acquired -> content ready -> diagnosed -> updated.
//! Any failure aborts the run before the next stage; nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::UpdateDefaults;
use crate::metrics;
use crate::oracle::{Diagnosis, DiagnosisOracle, OracleError};
use crate::session::{Session, SessionCache};
use crate::ticketing::{
    NewArticle, TicketFieldOverrides, TicketFields, TicketRef, TicketUpdate, TicketingGateway,
};

use super::types::{Content, PipelineStage, RelayError, RelayOutcome, RelayRequest};

/// Drives one ticket from fetch through diagnosis to write-back.
pub struct TicketRelay {
    sessions: Arc<SessionCache>,
    gateway: Arc<dyn TicketingGateway>,
    oracle: Option<Arc<dyn DiagnosisOracle>>,
    defaults: UpdateDefaults,
}

impl TicketRelay {
    /// Create a relay. Without an oracle only explicit-body runs succeed.
    pub fn new(
        sessions: Arc<SessionCache>,
        gateway: Arc<dyn TicketingGateway>,
        oracle: Option<Arc<dyn DiagnosisOracle>>,
        defaults: UpdateDefaults,
    ) -> Self {
        Self {
            sessions,
            gateway,
            oracle,
            defaults,
        }
    }

    pub fn defaults(&self) -> &UpdateDefaults {
        &self.defaults
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Run the pipeline for one request.
    pub async fn run(&self, request: RelayRequest) -> Result<RelayOutcome, RelayError> {
        let start = Instant::now();
        let result = self.run_stages(request).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::RELAY_RUNS.with_label_values(&[outcome]).inc();
        metrics::RELAY_DURATION
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::RELAY_STAGE_FAILURES
                .with_label_values(&[e.stage().as_str()])
                .inc();
            warn!(stage = e.stage().as_str(), kind = e.kind(), error = %e, "Relay run aborted");
        }

        result
    }

    async fn run_stages(&self, request: RelayRequest) -> Result<RelayOutcome, RelayError> {
        let RelayRequest {
            ticket,
            session_id,
            body,
            ticket_text,
            overrides,
        } = request;

        let ticket = ticket
            .ok_or_else(|| RelayError::Validation("ticket_id is required".to_string()))?;

        let session = self.session_for(session_id).await?;
        debug!(
            ticket_id = %ticket,
            stage = PipelineStage::SessionAcquired.as_str(),
            session = %session.token_preview(),
            "Session ready"
        );

        let content = self
            .resolve_content(&ticket, &session, non_empty(body), non_empty(ticket_text))
            .await?;
        debug!(ticket_id = %ticket, stage = PipelineStage::ContentReady.as_str(), "Content ready");

        let (article_body, diagnosis) = match content {
            Content::Explicit(body) => {
                info!(ticket_id = %ticket, "Explicit body supplied, skipping diagnosis");
                (body, None)
            }
            Content::Diagnose(text) => {
                let diagnosis = self.diagnose(&text).await?;
                info!(
                    ticket_id = %ticket,
                    stage = PipelineStage::Diagnosed.as_str(),
                    type_id = diagnosis.ticket_type.code(),
                    "Ticket diagnosed"
                );
                (diagnosis.text.clone(), Some(diagnosis))
            }
        };

        let update = self.build_update(
            &overrides,
            article_body.clone(),
            diagnosis.as_ref().map(|d| d.ticket_type.code()),
        );

        let write_failed = |source| RelayError::BackendWrite {
            ticket: ticket.clone(),
            source,
            diagnosis: diagnosis.clone(),
        };

        let outcome = self
            .gateway
            .apply_update(&ticket, &session, &update)
            .await
            .map_err(write_failed)?;

        if let Some(err) = outcome.backend_error() {
            return Err(write_failed(err));
        }

        info!(ticket_id = %ticket, stage = PipelineStage::Updated.as_str(), "Ticket updated");

        Ok(RelayOutcome {
            ok: true,
            ticket_id: ticket,
            diagnosis: article_body,
            type_id: update.ticket.type_id,
            response: outcome.response,
        })
    }

    /// Caller-supplied tokens win and are used without validation.
    async fn session_for(&self, session_id: Option<String>) -> Result<Session, RelayError> {
        match non_empty(session_id) {
            Some(token) => Ok(Session::supplied(token)),
            None => Ok(self.sessions.acquire().await?),
        }
    }

    async fn resolve_content(
        &self,
        ticket: &TicketRef,
        session: &Session,
        body: Option<String>,
        ticket_text: Option<String>,
    ) -> Result<Content, RelayError> {
        if let Some(body) = body {
            return Ok(Content::Explicit(body));
        }
        if let Some(text) = ticket_text {
            return Ok(Content::Diagnose(text));
        }

        let fetched = self
            .gateway
            .fetch_latest_article(ticket, session)
            .await
            .map_err(|source| RelayError::ContentFetch {
                ticket: ticket.clone(),
                source,
            })?;

        match non_empty(fetched) {
            Some(text) => Ok(Content::Diagnose(text)),
            None => Err(RelayError::ContentUnavailable {
                ticket: ticket.clone(),
            }),
        }
    }

    async fn diagnose(&self, text: &str) -> Result<Diagnosis, RelayError> {
        let oracle = self.oracle.as_ref().ok_or_else(|| {
            OracleError::NotConfigured("no diagnosis provider configured".to_string())
        })?;
        Ok(oracle.diagnose(text).await?)
    }

    /// Merge caller overrides over the configured defaults.
    fn build_update(
        &self,
        overrides: &TicketFieldOverrides,
        body: String,
        type_id: Option<u32>,
    ) -> TicketUpdate {
        let d = &self.defaults;
        TicketUpdate {
            ticket: TicketFields {
                title: overrides.title.clone().unwrap_or_else(|| d.title.clone()),
                customer_user: overrides
                    .customer_user
                    .clone()
                    .unwrap_or_else(|| d.customer_user.clone()),
                queue_id: overrides.queue_id.unwrap_or(d.queue_id),
                priority_id: overrides.priority_id.unwrap_or(d.priority_id),
                state_id: overrides.state_id.unwrap_or(d.state_id),
                type_id,
                dynamic_fields: overrides.dynamic_fields.clone(),
            },
            article: NewArticle {
                subject: overrides.subject.clone().unwrap_or_else(|| d.subject.clone()),
                body,
                content_type: d.content_type.clone(),
            },
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
