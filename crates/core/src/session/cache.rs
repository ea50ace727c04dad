//! Single-flight session cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics::SESSION_LOGINS;

use super::{Session, SessionError, SessionLogin};

/// Caches one backend session for the whole process.
///
/// The cached slot is guarded by an async mutex that stays locked across the
/// login call, so concurrent callers on a cache miss wait for the single
/// in-flight login instead of starting their own.
pub struct SessionCache {
    login: Arc<dyn SessionLogin>,
    ttl: Duration,
    override_token: Option<String>,
    cached: Mutex<Option<Session>>,
}

impl SessionCache {
    /// Create a cache that logs in through `login` and reuses tokens for `ttl`.
    pub fn new(login: Arc<dyn SessionLogin>, ttl: Duration) -> Self {
        Self {
            login,
            ttl,
            override_token: None,
            cached: Mutex::new(None),
        }
    }

    /// Use an externally supplied token instead of logging in.
    /// Empty tokens are ignored.
    pub fn with_override(mut self, token: Option<String>) -> Self {
        self.override_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a valid session, logging in if the cached one is absent or expired.
    ///
    /// A failed login leaves the previous cache contents untouched and never
    /// returns a stale token.
    pub async fn acquire(&self) -> Result<Session, SessionError> {
        if let Some(token) = &self.override_token {
            return Ok(Session::external(token.clone()));
        }

        let mut cached = self.cached.lock().await;
        if let Some(session) = cached.as_ref() {
            if session.is_valid() {
                debug!("Reusing cached backend session");
                return Ok(session.clone());
            }
            debug!("Cached backend session expired");
        }

        match self.login.create_session().await {
            Ok(token) => {
                SESSION_LOGINS.with_label_values(&["success"]).inc();
                let session = Session::created(token, self.ttl);
                info!(token = %session.token_preview(), "Created backend session");
                *cached = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                SESSION_LOGINS.with_label_values(&["failure"]).inc();
                warn!(error = %e, "Backend login failed");
                Err(e)
            }
        }
    }
}
