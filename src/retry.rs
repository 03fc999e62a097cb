//! Bounded polling
//!
//! A condition is evaluated immediately and then once per interval until it
//! reports done or the deadline passes. Failed evaluations are retried; when
//! the deadline passes the most recent failure is returned.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default interval between attempts (1 second)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default overall deadline (30 seconds)
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval and deadline of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Poll `condition` until it returns `Ok(true)`.
    ///
    /// `Ok(false)` and `Err(_)` both schedule another attempt. On deadline the
    /// last error seen is returned, or [`Error::Timeout`] if none was.
    pub async fn poll_immediate<F, Fut>(&self, operation: &str, mut condition: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_error = None;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match condition().await {
                Ok(true) => {
                    debug!(operation, attempt, "Poll condition satisfied");
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(operation, attempt, error = %e, "Poll attempt failed, retrying...");
                    last_error = Some(e);
                }
            }

            if Instant::now() + self.interval > deadline {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        Err(last_error.unwrap_or_else(|| Error::Timeout {
            operation: operation.to_string(),
        }))
    }
}
