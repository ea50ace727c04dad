//! Ticket relay: the fetch -> diagnose -> write-back pipeline.
//!
//! Composes the session cache, the ticketing gateway and the diagnosis
//! oracle into a single linear run with a typed failure per stage.

mod runner;
mod types;

pub use runner::TicketRelay;
pub use types::{FailureStage, PipelineStage, RelayError, RelayOutcome, RelayRequest};
