//! Retry pacing for service proxies.
//!
//! The proxy retries cluster-transient failures without an attempt limit; this module
//! only decides how long to wait between attempts and lets the wait be cancelled.

use super::error::InvocationError;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between two resolution attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

const MAX_JITTER_MS: u64 = 50;

/// Delay policy applied after each retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// The same delay before every retry.
    Fixed(Duration),
    /// Doubles per consecutive retry up to `max`, with a small random jitter.
    Exponential { initial: Duration, max: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(DEFAULT_RETRY_DELAY)
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let shift = attempt.saturating_sub(1).min(16);
                let base = initial.saturating_mul(1u32 << shift).min(max);
                // Simple jitter to prevent thundering herd
                let jitter = Duration::from_millis(rand::random::<u64>() % MAX_JITTER_MS);
                (base + jitter).min(max)
            }
        }
    }
}

/// Backoff policy plus the cancellation signal that aborts a pending retry.
#[derive(Debug, Clone)]
pub struct Retry {
    backoff: Backoff,
    cancel: CancellationToken,
}

impl Retry {
    pub fn new(backoff: Backoff) -> Self {
        Self::with_cancellation(backoff, CancellationToken::new())
    }

    pub fn with_cancellation(backoff: Backoff, cancel: CancellationToken) -> Self {
        Self { backoff, cancel }
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits before retry number `attempt`.
    ///
    /// Fails with `Interrupted` if the token is or becomes cancelled; the token is left
    /// cancelled so every other caller sharing it observes the cancellation too.
    pub async fn pause(&self, attempt: u32) -> Result<(), InvocationError> {
        if self.cancel.is_cancelled() {
            return Err(InvocationError::Interrupted);
        }

        let delay = self.backoff.delay(attempt);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(InvocationError::Interrupted),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

impl Default for Retry {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}
