//! Webhook ingestion: event capture, the append-only event log, and
//! resolution of the ticket an event refers to.

mod event_log;
mod resolver;
mod types;

pub use event_log::{EventLog, EventLogError};
pub use resolver::{Resolution, ResolutionError, ResolutionSource, WebhookResolver};
pub use types::*;
