//! Mock backend login for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::session::{SessionError, SessionLogin};

/// Mock implementation of the SessionLogin trait.
///
/// Each successful login hands out a fresh token (`token-1`, `token-2`, ...)
/// so tests can tell a cached session from a new one.
#[derive(Debug, Default)]
pub struct MockLogin {
    /// Login calls made, including failed ones.
    count: AtomicU32,
    /// Simulated login latency.
    delay: Mutex<Option<Duration>>,
    /// If set, the next login fails with this error.
    next_error: Mutex<Option<SessionError>>,
}

impl MockLogin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of login calls made so far.
    pub fn login_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Make every subsequent login take `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Fail the next login with `error`.
    pub fn fail_next(&self, error: SessionError) {
        *self.next_error.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl SessionLogin for MockLogin {
    async fn create_session(&self) -> Result<String, SessionError> {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }

        Ok(format!("token-{}", n))
    }
}
