use std::sync::Arc;
use ticketlens_core::{Config, SanitizedConfig, TicketRelay, WebhookResolver};

/// Shared application state
pub struct AppState {
    config: Config,
    relay: Arc<TicketRelay>,
    resolver: Arc<WebhookResolver>,
}

impl AppState {
    pub fn new(config: Config, relay: Arc<TicketRelay>, resolver: Arc<WebhookResolver>) -> Self {
        Self {
            config,
            relay,
            resolver,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn relay(&self) -> &TicketRelay {
        &self.relay
    }

    pub fn resolver(&self) -> &WebhookResolver {
        &self.resolver
    }

    /// Whether a configured session token overrides tokens sent by webhooks.
    pub fn has_session_override(&self) -> bool {
        self.config
            .znuny
            .session_id
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}
