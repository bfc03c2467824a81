//! The circuit breaker half of the resilience stack (§4.5.4.1): one
//! `Closed -> Open -> HalfOpen` state machine per `(provider, model)` pair,
//! shared across every concurrent agent run that targets that pair.
//!
//! Reading whether the circuit is open must never itself flip a state
//! transition — only [`CircuitBreaker::acquire`] can move `Open` to
//! `HalfOpen`, and only after the open duration has elapsed. This keeps
//! dashboards and health checks (which only ever observe) from racing the
//! one caller that actually gets to attempt the half-open probe.

use giant_core::config::CircuitBreakerConfig;
use giant_core::error::ProviderError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
enum State {
	Closed,
	Open { opened_at: Instant },
	HalfOpen,
}

/// Per-`(provider, model)` circuit breaker state, safe to share behind an
/// `Arc` across concurrently running agents.
pub struct CircuitBreaker {
	provider: String,
	model: String,
	state: Mutex<State>,
	consecutive_failures: AtomicU32,
	failure_threshold: u32,
	open_duration: Duration,
}

impl CircuitBreaker {
	#[must_use]
	pub fn new(provider: impl Into<String>, model: impl Into<String>, config: CircuitBreakerConfig) -> Self {
		Self {
			provider: provider.into(),
			model: model.into(),
			state: Mutex::new(State::Closed),
			consecutive_failures: AtomicU32::new(0),
			failure_threshold: config.failure_threshold,
			open_duration: config.open_duration(),
		}
	}

	/// Observer: reports whether the circuit is currently open, without
	/// mutating state. Never transitions `Open` to `HalfOpen` on its own.
	#[must_use]
	pub fn is_open(&self) -> bool {
		matches!(*self.state.lock(), State::Open { .. })
	}

	/// Acquirer: the one path that may transition `Open` to `HalfOpen`, once
	/// the open duration has elapsed. Returns an error if the circuit is
	/// still open.
	///
	/// # Errors
	/// Returns [`ProviderError::CircuitOpen`] if the circuit is open and the
	/// open duration hasn't elapsed yet.
	pub fn acquire(&self) -> Result<(), ProviderError> {
		let mut state = self.state.lock();
		match *state {
			State::Closed | State::HalfOpen => Ok(()),
			State::Open { opened_at } => {
				if opened_at.elapsed() >= self.open_duration {
					*state = State::HalfOpen;
					Ok(())
				} else {
					Err(ProviderError::CircuitOpen {
						provider: self.provider.clone(),
						model: self.model.clone(),
					})
				}
			}
		}
	}

	/// Records a successful call: closes the circuit and resets the failure
	/// counter.
	pub fn record_success(&self) {
		*self.state.lock() = State::Closed;
		self.consecutive_failures.store(0, Ordering::Relaxed);
	}

	/// Records a failed call. A failure during the half-open probe reopens
	/// the circuit immediately; otherwise the circuit opens once
	/// `failure_threshold` consecutive failures accumulate.
	pub fn record_failure(&self) {
		let mut state = self.state.lock();
		if matches!(*state, State::HalfOpen) {
			*state = State::Open { opened_at: Instant::now() };
			self.consecutive_failures.store(0, Ordering::Relaxed);
			return;
		}
		let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
		if failures >= self.failure_threshold {
			*state = State::Open { opened_at: Instant::now() };
		}
	}
}
