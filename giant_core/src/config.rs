//! Runtime configuration: provider wiring, agent loop limits, and the
//! evaluation orchestrator's concurrency knobs.
//!
//! Every config type here is validated once, at construction
//! (`Config::validate` / the `TryFrom` impls), so the rest of the codebase
//! can treat a `AgentConfig` or `ProviderConfig` value as already-sound. The
//! CLI is the only caller that builds these from untrusted input (flags,
//! env vars, files); once built, a config is passed around by value or
//! `Arc` and never re-validated.

use anyhow::{ensure, Result};
use giant_derive::context;
use std::path::PathBuf;
use std::time::Duration;

/// Which wire protocol a provider speaks. The two families diverge in how
/// the image is billed and what target size keeps crops legible to the
/// model; everything else (retry, rate limiting, circuit breaking) is
/// shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
	/// Structured-output-via-JSON-schema request shape.
	JsonSchema,
	/// Tool-use-with-forced-invocation request shape.
	ToolUse,
}

impl ProviderFamily {
	/// The crop target long-side in pixels this family expects (§4.5.6).
	#[must_use]
	pub fn target_size(self) -> u32 {
		match self {
			ProviderFamily::JsonSchema => 1000,
			ProviderFamily::ToolUse => 500,
		}
	}
}

/// How an image contributes to request cost.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageTerm {
	/// A flat per-image add-on regardless of pixel count (Family A).
	FixedPerImage(f64),
	/// A per-megapixel rate, proportional to the encoded image's pixel
	/// count (Family B).
	PerMegapixel(f64),
}

/// Per-1000-token text pricing plus the provider family's image cost term.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceTable {
	pub input_price_per_1k: f64,
	pub output_price_per_1k: f64,
	pub image_term: ImageTerm,
}

impl PriceTable {
	/// # Errors
	/// Returns an error if any rate is negative.
	#[context("validating price table")]
	pub fn validate(&self) -> Result<()> {
		ensure!(self.input_price_per_1k >= 0.0, "input_price_per_1k must be >= 0");
		ensure!(self.output_price_per_1k >= 0.0, "output_price_per_1k must be >= 0");
		let image_rate = match self.image_term {
			ImageTerm::FixedPerImage(rate) | ImageTerm::PerMegapixel(rate) => rate,
		};
		ensure!(image_rate >= 0.0, "image pricing rate must be >= 0");
		Ok(())
	}
}

/// Thresholds governing the `Closed -> Open -> HalfOpen` state machine
/// shared per `(provider, model)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CircuitBreakerConfig {
	/// Consecutive failures before the circuit opens.
	pub failure_threshold: u32,
	/// How long the circuit stays open before allowing one half-open probe.
	pub open_duration_secs: u64,
}

impl Default for CircuitBreakerConfig {
	fn default() -> Self {
		Self {
			failure_threshold: 5,
			open_duration_secs: 30,
		}
	}
}

impl CircuitBreakerConfig {
	#[must_use]
	pub fn open_duration(&self) -> Duration {
		Duration::from_secs(self.open_duration_secs)
	}

	/// # Errors
	/// Returns an error if `failure_threshold` is zero.
	#[context("validating circuit breaker config")]
	pub fn validate(&self) -> Result<()> {
		ensure!(self.failure_threshold > 0, "failure_threshold must be > 0");
		Ok(())
	}
}

/// Everything needed to address and bill one provider/model endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderConfig {
	pub family: ProviderFamily,
	pub endpoint: String,
	pub model: String,
	/// Name of the environment variable holding the API key, e.g.
	/// `GIANT_ACME_API_KEY`. The key itself never lives in this struct.
	pub api_key_env: String,
	/// Requests-per-minute budget enforced by the local rate limiter.
	pub rpm: u32,
	#[serde(default)]
	pub circuit_breaker: CircuitBreakerConfig,
	pub price_table: PriceTable,
}

impl ProviderConfig {
	/// # Errors
	/// Returns an error if the endpoint/model/env var name is empty, `rpm`
	/// is zero, or the nested configs fail their own validation.
	#[context("validating provider config for model {}", self.model)]
	pub fn validate(&self) -> Result<()> {
		ensure!(!self.endpoint.trim().is_empty(), "endpoint must not be empty");
		ensure!(!self.model.trim().is_empty(), "model must not be empty");
		ensure!(!self.api_key_env.trim().is_empty(), "api_key_env must not be empty");
		ensure!(self.rpm > 0, "rpm must be > 0");
		self.circuit_breaker.validate()?;
		self.price_table.validate()?;
		Ok(())
	}

	/// Reads the API key from `api_key_env`.
	///
	/// # Errors
	/// Returns [`crate::error::ProviderError::MissingApiKey`] if the
	/// variable is unset.
	pub fn read_api_key(&self) -> Result<String, crate::error::ProviderError> {
		std::env::var(&self.api_key_env).map_err(|_| crate::error::ProviderError::MissingApiKey {
			env_var: self.api_key_env.clone(),
		})
	}
}

/// Limits governing one agent run: how long it may try before the runner
/// forces an answer, and how the HTTP client is configured.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AgentConfig {
	/// Hard ceiling on agent turns before the runner enters `Forcing`.
	pub max_steps: u32,
	/// Consecutive recoverable errors tolerated before the run is abandoned.
	pub max_retries: u32,
	/// Attempts given to the `Forcing` state after the step cap is hit
	/// before the run is declared a failure.
	pub force_answer_retries: u32,
	/// Long side, in pixels, of the full-slide thumbnail seeded into Turn 0.
	pub thumbnail_size: u32,
	/// Hard dollar ceiling for one run; `None` disables the check, as does
	/// an explicit `Some(0.0)` (§4.8: "budget_usd=0 disables the check").
	pub budget_usd: Option<f64>,
	/// When set, the model MUST crop on steps `1..max_steps-1` and MUST
	/// answer on step `max_steps` (Fixed Iterations Mode, §4.7).
	pub enforce_fixed_iterations: bool,
	/// When set, a missing scalable font is a hard error instead of a
	/// silent fallback to the embedded bitmap font (§4.4).
	pub strict_font_check: bool,
	/// Whether the optional `Conch` tool action is available to the model.
	pub enable_conch: bool,
	/// Replaces the Prompt Builder's default system prompt verbatim when
	/// set.
	pub system_prompt_override: Option<String>,
	pub request_timeout_secs: u64,
	pub provider: ProviderConfig,
}

impl AgentConfig {
	#[must_use]
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	/// Whether the run has a live budget ceiling worth checking against
	/// (`None` and `Some(0.0)` both disable the check).
	#[must_use]
	pub fn budget_enabled(&self) -> bool {
		self.budget_usd.is_some_and(|b| b > 0.0)
	}

	/// # Errors
	/// Returns an error if `max_steps`/`force_answer_retries`/
	/// `thumbnail_size`/`request_timeout_secs` are zero, `budget_usd` is
	/// negative, or the nested `ProviderConfig` fails validation.
	#[context("validating agent config")]
	pub fn validate(&self) -> Result<()> {
		ensure!(self.max_steps > 0, "max_steps must be > 0");
		ensure!(self.max_retries > 0, "max_retries must be > 0");
		ensure!(self.force_answer_retries > 0, "force_answer_retries must be > 0");
		ensure!(self.thumbnail_size > 0, "thumbnail_size must be > 0");
		if let Some(budget) = self.budget_usd {
			ensure!(budget >= 0.0, "budget_usd must be >= 0");
		}
		ensure!(self.request_timeout_secs > 0, "request_timeout_secs must be > 0");
		self.provider.validate()?;
		Ok(())
	}
}

/// Concurrency and resumability knobs for the evaluation orchestrator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrchestratorConfig {
	/// Upper bound on in-flight agent runs.
	pub max_concurrency: usize,
	/// How many independent runs to execute per benchmark item before
	/// taking a majority vote.
	pub runs_per_item: u32,
	/// Where completed-item checkpoints are appended; resumed runs skip
	/// items already present here.
	pub checkpoint_path: Option<PathBuf>,
}

impl OrchestratorConfig {
	/// # Errors
	/// Returns an error if `max_concurrency` or `runs_per_item` is zero.
	#[context("validating orchestrator config")]
	pub fn validate(&self) -> Result<()> {
		ensure!(self.max_concurrency > 0, "max_concurrency must be > 0");
		ensure!(self.runs_per_item > 0, "runs_per_item must be > 0");
		Ok(())
	}
}
