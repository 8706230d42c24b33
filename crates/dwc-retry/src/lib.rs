//! A small, stateless retry/backoff policy, reused by the GBIF client (C9)
//! for `species/match`, `geocode/reverse`, `species/suggest`, and
//! `occurrence/search` calls.
//!
//! Per §9 DESIGN NOTES: "Retries and backoff: a small reusable `Retrier`
//! utility with a stateless policy value (`attempts`, `backoff_factor`)."
//! Kept separate from any one HTTP client so it can be unit tested without
//! a network stack, mirroring how the teacher isolates
//! `HttpClient::execute_with_retry`'s backoff math from transport.

use std::time::Duration;

use tracing::warn;

/// A stateless retry policy: up to `attempts` tries, with exponential
/// backoff `backoff_factor * 2^attempt` seconds between attempts (§4.9).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(attempts: u32, backoff_factor: f64) -> Self {
        Self {
            attempts,
            backoff_factor,
        }
    }

    /// Backoff duration before retry attempt `attempt` (1-indexed).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor * 2f64.powi(attempt as i32);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1.0)
    }
}

/// What a single attempt did, used by `run` to decide whether to retry.
pub enum Outcome<T, E> {
    Done(T),
    Retryable(E),
    Fatal(E),
}

/// Run `attempt_fn` up to `policy.attempts` times, sleeping
/// `policy.backoff_for(n)` between retryable failures. Returns the last
/// error if every attempt is exhausted or a fatal error is returned.
pub async fn run<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut attempt_fn: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Outcome<T, E>>,
{
    let mut last_err = None;
    for attempt in 0..policy.attempts {
        match attempt_fn(attempt).await {
            Outcome::Done(value) => return Ok(value),
            Outcome::Fatal(e) => return Err(e),
            Outcome::Retryable(e) => {
                if attempt + 1 < policy.attempts {
                    let backoff = policy.backoff_for(attempt);
                    warn!(label, attempt, backoff_secs = backoff.as_secs_f64(), "retrying after transient failure");
                    tokio::time::sleep(backoff).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.expect("at least one attempt must have run when attempts > 0"))
}
