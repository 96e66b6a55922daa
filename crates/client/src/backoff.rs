//! Capped exponential backoff for reconnect attempts

use std::time::Duration;

/// Reconnect backoff: 1 s, 2 s, 4 s ... capped at 64 s.
#[derive(Debug)]
pub(crate) struct Backoff {
    min: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(64),
            attempt: 0,
        }
    }

    /// Delay before the next attempt.
    pub(crate) fn next(&mut self) -> Duration {
        let exp = self.attempt.min(31);
        self.attempt = self.attempt.saturating_add(1);

        self.min
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max)
    }

    /// Back to the initial delay, after a successful connection.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}
