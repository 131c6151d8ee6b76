use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with a bounded attempt count.
///
/// Shared by registry fetches, analyzer invocations and probe builds. The
/// policy only decides *when* to try again; callers classify failures as
/// transient or permanent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

/// Classification of one failed attempt.
#[derive(Debug)]
pub enum Attempt<E> {
    Transient(E),
    Permanent(E),
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryFailure<E> {
    Exhausted { attempts: u32, last: E },
    Permanent(E),
}

impl<E> RetryFailure<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryFailure::Exhausted { last, .. } => last,
            RetryFailure::Permanent(e) => e,
        }
    }
}

impl RetryPolicy {
    /// Retries without sleeping. Used by tests and by callers that pace themselves.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff before the attempt following failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T, E>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, Attempt<E>>,
    ) -> Result<T, RetryFailure<E>> {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(Attempt::Permanent(e)) => return Err(RetryFailure::Permanent(e)),
                Err(Attempt::Transient(e)) => {
                    if attempt >= attempts {
                        return Err(RetryFailure::Exhausted { attempts, last: e });
                    }
                    let delay = self.delay_for(attempt);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
