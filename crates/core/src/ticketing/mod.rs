//! Ticketing backend abstraction.
//!
//! This module provides a `TicketingGateway` trait for reading the latest
//! article of a ticket and writing a combined field + article update, and a
//! Znuny REST implementation.

mod types;
mod znuny;

pub use types::*;
pub use znuny::ZnunyClient;
