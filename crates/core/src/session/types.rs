//! Session types.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

/// Errors that can occur while obtaining a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection failed while logging in: {0}")]
    ConnectionFailed(String),

    #[error("Login request timed out")]
    Timeout,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Login response carried no session token: {0}")]
    MissingToken(String),
}

/// Where a session token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// Created by a login call and cached.
    Login,
    /// Configured override; never expires.
    Override,
    /// Supplied by the caller for a single run; never validated.
    Caller,
}

/// An authenticated backend session.
#[derive(Clone)]
pub struct Session {
    token: String,
    created_at: Instant,
    ttl: Option<Duration>,
    source: SessionSource,
}

impl Session {
    /// Session created by a login that stays valid for `ttl`.
    pub fn created(token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            created_at: Instant::now(),
            ttl: Some(ttl),
            source: SessionSource::Login,
        }
    }

    /// Session from a configured override.
    pub fn external(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            created_at: Instant::now(),
            ttl: None,
            source: SessionSource::Override,
        }
    }

    /// Session supplied by the caller of a single run.
    pub fn supplied(token: impl Into<String>) -> Self {
        Self {
            source: SessionSource::Caller,
            ..Self::external(token)
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> SessionSource {
        self.source
    }

    /// A session is valid while `now - created_at < ttl`.
    /// Sessions without a TTL are always valid.
    pub fn is_valid_at(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.created_at) < ttl,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    /// First characters of the token, safe to log.
    pub fn token_preview(&self) -> String {
        let preview: String = self.token.chars().take(10).collect();
        format!("{}...", preview)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token_preview())
            .field("ttl", &self.ttl)
            .field("source", &self.source)
            .finish()
    }
}

/// Performs the login exchange that creates a new session token.
#[async_trait]
pub trait SessionLogin: Send + Sync {
    /// Log in with the configured credentials and return the new token.
    async fn create_session(&self) -> Result<String, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_created_session_expires_after_ttl() {
        let session = Session::created("token", Duration::from_secs(60));
        assert!(session.is_valid());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(session.is_valid());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!session.is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_session_never_expires() {
        let session = Session::external("token");
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(session.is_valid());
        assert_eq!(session.source(), SessionSource::Override);
    }

    #[test]
    fn test_debug_hides_full_token() {
        let session = Session::supplied("0123456789abcdefghij");
        let debug = format!("{:?}", session);
        assert!(debug.contains("0123456789..."));
        assert!(!debug.contains("abcdefghij"));
        assert_eq!(session.source(), SessionSource::Caller);
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::AuthenticationFailed("bad password".to_string());
        assert_eq!(err.to_string(), "Authentication failed: bad password");
    }
}
