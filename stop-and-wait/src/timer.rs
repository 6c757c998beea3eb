//! Retransmission timer.
//!
//! Reliable delivery requires that an unacknowledged frame is re-sent if no
//! ack arrives within a bounded time.  [`RetransmitTimer`] holds that bound
//! as an explicit deadline instead of being polled in a busy loop: the
//! session awaits [`RetransmitTimer::expired`] alongside its mailboxes, so
//! the only suspension points are the timer and the network delay.
//!
//! The timeout is fixed; there is no RTT estimation or back-off.
//!
//! Built on [`tokio::time::Instant`], so tests running with paused time see
//! timeouts fire without real waiting.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// A one-shot, re-armable deadline.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    timeout: Duration,
    /// `Some` while armed.
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start (or restart) the countdown from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` once an armed timer has run for its full timeout.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Resolve when the armed deadline passes.  Never resolves while
    /// disarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
