//! The `Provider` trait every vision-LLM backend implements, plus the
//! shared per-`(provider, model)` resilience state every call layers
//! through: circuit breaker, then rate limiter, then retry (innermost to
//! outermost is breaker -> limiter -> retry; see §4.5.4 and the module
//! overview at the crate root).

use crate::circuit_breaker::CircuitBreaker;
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use dashmap::DashMap;
use giant_core::config::{PriceTable, ProviderConfig};
use giant_core::error::ProviderError;
use giant_core::model::{Message, StepResponse};
use std::sync::Arc;

/// A `(provider, model)` identity used to key the shared resilience state
/// registry.
pub type ProviderId = (String, String);

/// The circuit breaker and rate limiter shared by every call against one
/// `(provider, model)` pair, regardless of how many concurrent agent runs
/// target it.
pub struct ProviderState {
	pub circuit_breaker: CircuitBreaker,
	pub rate_limiter: RateLimiter,
}

impl ProviderState {
	fn new(config: &ProviderConfig) -> Self {
		Self {
			circuit_breaker: CircuitBreaker::new(config.endpoint.clone(), config.model.clone(), config.circuit_breaker),
			rate_limiter: RateLimiter::new(config.rpm),
		}
	}
}

/// Process-wide registry of [`ProviderState`], one entry per `(provider,
/// model)` pair, lazily created on first use and shared by every
/// [`Provider`] instance and every agent run.
#[derive(Default)]
pub struct ProviderRegistry {
	states: DashMap<ProviderId, Arc<ProviderState>>,
}

impl ProviderRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the shared state for `config`'s `(endpoint, model)` pair,
	/// creating it on first access.
	pub fn state_for(&self, config: &ProviderConfig) -> Arc<ProviderState> {
		let key = (config.endpoint.clone(), config.model.clone());
		self.states.entry(key).or_insert_with(|| Arc::new(ProviderState::new(config))).clone()
	}
}

/// One wire protocol's implementation of "take a conversation, return the
/// model's next action." Both families share the resilience stack and cost
/// accounting; they differ only in request/response shape and target crop
/// size.
#[async_trait]
pub trait Provider: Send + Sync {
	/// Sends `messages` to the remote model and parses its decision.
	///
	/// # Errors
	/// Returns a [`ProviderError`] for any transport, wire-format, or
	/// admission-control failure.
	async fn generate_response(&self, messages: &[Message]) -> Result<StepResponse, ProviderError>;

	/// The crop long-side, in pixels, this provider's wire format expects
	/// (§4.5.6): 1000 for JSON-schema providers, 500 for tool-use ones.
	fn target_size(&self) -> u32;

	/// The price table this provider's usage is billed against, so callers
	/// outside this crate (the Agent Runner's budget tripwire) can turn a
	/// [`StepResponse`]'s [`giant_core::model::TokenUsage`] into a dollar
	/// figure without duplicating pricing configuration.
	fn price_table(&self) -> &PriceTable;
}

/// Runs one call through the shared breaker -> limiter -> retry stack
/// around `call`. `call` performs the actual wire request and is retried
/// on transient failures per `retry_policy`.
///
/// # Errors
/// Returns [`ProviderError::CircuitOpen`] without calling `call` at all if
/// the circuit is open; [`ProviderError::RateLimited`] without calling
/// `call` if the local rate limiter is exhausted; otherwise whatever `call`
/// (after retries) ultimately returns.
pub async fn through_resilience_stack<T, F, Fut>(
	state: &ProviderState,
	retry_policy: &RetryPolicy,
	provider: &str,
	model: &str,
	mut call: F,
) -> Result<T, ProviderError>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
	state.circuit_breaker.acquire()?;
	if !state.rate_limiter.try_acquire() {
		return Err(ProviderError::RateLimited { provider: provider.to_string(), model: model.to_string() });
	}
	let result = crate::retry::with_retry(retry_policy, |_attempt| call()).await;
	match &result {
		Ok(_) => state.circuit_breaker.record_success(),
		Err(_) => state.circuit_breaker.record_failure(),
	}
	result
}

#[cfg(test)]
mod tests {
	use super::*;
	use giant_core::config::{CircuitBreakerConfig, ImageTerm, PriceTable, ProviderFamily};
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::time::Duration;

	fn sample_config() -> ProviderConfig {
		ProviderConfig {
			family: ProviderFamily::JsonSchema,
			endpoint: "https://api.example.com".into(),
			model: "vision-1".into(),
			api_key_env: "GIANT_TEST_KEY".into(),
			rpm: 60,
			circuit_breaker: CircuitBreakerConfig::default(),
			price_table: PriceTable { input_price_per_1k: 0.0, output_price_per_1k: 0.0, image_term: ImageTerm::FixedPerImage(0.0) },
		}
	}

	#[test]
	fn registry_returns_the_same_state_for_the_same_pair() {
		let registry = ProviderRegistry::new();
		let config = sample_config();
		let a = registry.state_for(&config);
		let b = registry.state_for(&config);
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn registry_returns_distinct_state_for_distinct_models() {
		let registry = ProviderRegistry::new();
		let mut other = sample_config();
		other.model = "vision-2".into();
		let a = registry.state_for(&sample_config());
		let b = registry.state_for(&other);
		assert!(!Arc::ptr_eq(&a, &b));
	}

	#[tokio::test]
	async fn open_circuit_short_circuits_before_the_rate_limiter() {
		let config = sample_config();
		let state = ProviderState::new(&config);
		state.circuit_breaker.record_failure();
		state.circuit_breaker.record_failure();
		state.circuit_breaker.record_failure();
		state.circuit_breaker.record_failure();
		state.circuit_breaker.record_failure();
		assert!(state.circuit_breaker.is_open());

		let calls = AtomicU32::new(0);
		let retry_policy = RetryPolicy { min_backoff: Duration::from_millis(1), max_backoff: Duration::from_millis(1), max_attempts: 1 };
		let result: Result<(), ProviderError> = through_resilience_stack(&state, &retry_policy, "acme", "vision-1", || {
			calls.fetch_add(1, Ordering::SeqCst);
			async { Ok(()) }
		})
		.await;
		assert!(matches!(result, Err(ProviderError::CircuitOpen { .. })));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn a_successful_call_closes_the_circuit_and_records_success() {
		let config = sample_config();
		let state = ProviderState::new(&config);
		let retry_policy = RetryPolicy { min_backoff: Duration::from_millis(1), max_backoff: Duration::from_millis(1), max_attempts: 1 };
		let result = through_resilience_stack(&state, &retry_policy, "acme", "vision-1", || async { Ok::<_, ProviderError>(1) }).await;
		assert!(result.is_ok());
		assert!(!state.circuit_breaker.is_open());
	}
}
