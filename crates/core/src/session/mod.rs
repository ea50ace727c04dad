//! Authenticated sessions against the ticketing backend.
//!
//! A [`SessionCache`] hands out one process-wide token, logging in through a
//! [`SessionLogin`] implementation only when the cached token is missing or
//! has outlived its TTL.

mod cache;
mod types;

pub use cache::SessionCache;
pub use types::*;
