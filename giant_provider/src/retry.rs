//! The outermost layer of the resilience stack (§4.5.4.3): exponential
//! backoff with full jitter, retrying only the two error kinds a retry can
//! plausibly fix — a transient transport failure or a rate limit the local
//! limiter already predicted. Everything else (circuit open, malformed
//! response, missing credentials) is handed straight back to the caller;
//! retrying those would just waste the attempt budget.

use giant_core::error::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub min_backoff: Duration,
	pub max_backoff: Duration,
	pub max_attempts: u32,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			min_backoff: Duration::from_secs(1),
			max_backoff: Duration::from_secs(60),
			max_attempts: 6,
		}
	}
}

fn is_retryable(err: &ProviderError) -> bool {
	matches!(err, ProviderError::Transport(_) | ProviderError::RateLimited { .. })
}

/// Exponential backoff for `attempt` (0-based), capped at `max_backoff`,
/// then jittered uniformly down from that cap ("full jitter": AWS's
/// architecture-blog term for `random(0, cap)`, as opposed to merely
/// jittering around the capped value).
fn backoff_for(policy: &RetryPolicy, attempt: u32) -> Duration {
	let exponential = policy.min_backoff.as_secs_f64() * 2f64.powi(attempt as i32);
	let capped = exponential.min(policy.max_backoff.as_secs_f64());
	let jittered = rand::rng().random_range(0.0..=capped);
	Duration::from_secs_f64(jittered)
}

/// Runs `attempt_fn` up to `policy.max_attempts` times, sleeping with
/// jittered exponential backoff between retryable failures. `attempt_fn`
/// receives the 0-based attempt index, for logging.
///
/// # Errors
/// Returns the last error once attempts are exhausted, or immediately for
/// any non-retryable error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> Result<T, ProviderError>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, ProviderError>>,
{
	let mut last_err = None;
	for attempt in 0..policy.max_attempts {
		match attempt_fn(attempt).await {
			Ok(value) => return Ok(value),
			Err(err) if is_retryable(&err) && attempt + 1 < policy.max_attempts => {
				let wait = backoff_for(policy, attempt);
				log::warn!(
					"provider call failed (attempt {}/{}), retrying in {:.1}s: {err}",
					attempt + 1,
					policy.max_attempts,
					wait.as_secs_f64()
				);
				tokio::time::sleep(wait).await;
				last_err = Some(err);
			}
			Err(err) => return Err(err),
		}
	}
	Err(last_err.unwrap_or(ProviderError::RetriesExhausted { attempts: policy.max_attempts }))
}
