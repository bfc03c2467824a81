//! Error kinds shared across crates.
//!
//! Each kind below is a plain enum, not a type most code matches on directly
//! — callers propagate it as `anyhow::Error` via `?` and only reach for
//! `anyhow::Error::downcast_ref` at the handful of sites that branch on the
//! specific failure (the Agent Runner's recovery logic, the CLI's exit-code
//! mapping).

use std::fmt;

/// Failure modes from the provider layer: transport, wire format, and the
/// admission-control wrappers (circuit breaker, rate limiter) around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
	/// The circuit breaker for `(provider, model)` is open; the call was
	/// rejected without reaching the network.
	CircuitOpen { provider: String, model: String },
	/// The local token-bucket rate limiter has no budget left this window.
	RateLimited { provider: String, model: String },
	/// The API key env var named in `ProviderConfig::api_key_env` is unset.
	MissingApiKey { env_var: String },
	/// The remote API rejected the call's credentials (HTTP 401/403).
	InvalidCredentials { provider: String, model: String },
	/// The HTTP transport itself failed (connect, timeout, TLS, non-2xx).
	Transport(String),
	/// A 2xx response body didn't contain a usable JSON value, or the value
	/// didn't match the shape this provider family expects.
	Parse { raw: String, reason: String },
	/// The model named an action type this provider family doesn't know how
	/// to decode.
	UnknownActionType { raw_action: String },
	/// A usage accounting field (prompt/completion tokens) was nil, so a
	/// dollar cost cannot be computed for this call (§4.5.5).
	CostMissing { provider: String, model: String },
	/// An image payload submitted for pixel-based cost accounting was nil,
	/// an empty string, or decoded to zero bytes.
	InvalidImagePayload(String),
	/// Retries were exhausted without a usable response.
	RetriesExhausted { attempts: u32 },
}

impl fmt::Display for ProviderError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProviderError::CircuitOpen { provider, model } => {
				write!(f, "circuit breaker open for {provider}/{model}")
			}
			ProviderError::RateLimited { provider, model } => {
				write!(f, "rate limit exhausted for {provider}/{model}")
			}
			ProviderError::MissingApiKey { env_var } => {
				write!(f, "environment variable {env_var} is not set")
			}
			ProviderError::InvalidCredentials { provider, model } => {
				write!(f, "{provider}/{model} rejected the request's credentials")
			}
			ProviderError::Transport(detail) => write!(f, "transport error: {detail}"),
			ProviderError::Parse { raw, reason } => {
				write!(f, "could not parse provider response ({reason}): {raw}")
			}
			ProviderError::UnknownActionType { raw_action } => {
				write!(f, "unknown action type: {raw_action}")
			}
			ProviderError::CostMissing { provider, model } => {
				write!(f, "{provider}/{model} response is missing token usage, cannot compute cost")
			}
			ProviderError::InvalidImagePayload(detail) => {
				write!(f, "invalid image payload: {detail}")
			}
			ProviderError::RetriesExhausted { attempts } => {
				write!(f, "retries exhausted after {attempts} attempt(s)")
			}
		}
	}
}

impl std::error::Error for ProviderError {}

/// Failure modes from the Crop Engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CropError {
	/// The requested region failed [`crate::geometry::Region::validate`]
	/// against the slide's bounds.
	OutOfBounds(crate::geometry::OutOfBounds),
	/// The region, at the level the Pyramid Level Selector chose, would
	/// need to read more than `max` pixels along its long side (§4.3 step
	/// 3, the memory guard).
	RegionTooLarge { width: u32, height: u32, level: usize, max: u32 },
	/// The underlying slide reader returned an image whose dimensions don't
	/// match what was requested.
	UnexpectedDimensions { expected: (u32, u32), actual: (u32, u32) },
	/// The underlying slide reader failed to decode the requested region.
	ReadError(String),
	/// Downscaling the read pixels to the provider's target long side failed.
	ResizeFailed(String),
	/// JPEG encoding of the final crop failed.
	EncodingFailed(String),
}

impl fmt::Display for CropError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CropError::OutOfBounds(inner) => write!(f, "{inner}"),
			CropError::RegionTooLarge { width, height, level, max } => write!(
				f,
				"region would read {width}x{height} pixels at level {level}, exceeding the {max}px memory guard"
			),
			CropError::UnexpectedDimensions { expected, actual } => write!(
				f,
				"slide reader returned {}x{} pixels, expected {}x{}",
				actual.0, actual.1, expected.0, expected.1
			),
			CropError::ReadError(detail) => write!(f, "slide read failed: {detail}"),
			CropError::ResizeFailed(detail) => write!(f, "resize failed: {detail}"),
			CropError::EncodingFailed(detail) => write!(f, "JPEG encoding failed: {detail}"),
		}
	}
}

impl std::error::Error for CropError {}

impl From<crate::geometry::OutOfBounds> for CropError {
	fn from(value: crate::geometry::OutOfBounds) -> Self {
		CropError::OutOfBounds(value)
	}
}

/// A setup-time failure the CLI can identify by kind (bad flags, an
/// unreadable or invalid config file, a config value that fails its own
/// `validate()`) so it can map them to exit code `2` ("invalid args") rather
/// than the generic `1` ("runtime error") every other failure gets (§6.4/§7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn provider_error_messages_name_the_provider_and_model() {
		let err = ProviderError::CircuitOpen {
			provider: "acme".into(),
			model: "vision-1".into(),
		};
		assert!(err.to_string().contains("acme"));
		assert!(err.to_string().contains("vision-1"));
	}

	#[test]
	fn crop_error_wraps_out_of_bounds() {
		let region = crate::geometry::Region::new(0, 0, 0, 10);
		let bounds = crate::geometry::Size::new(100, 100).unwrap();
		let out_of_bounds = region.validate(bounds).unwrap_err();
		let crop_err: CropError = out_of_bounds.into();
		assert!(matches!(crop_err, CropError::OutOfBounds(_)));
	}

	#[test]
	fn config_error_round_trips_through_anyhow_downcast() {
		let err: anyhow::Error = ConfigError("budget_usd must be >= 0".into()).into();
		assert!(err.downcast_ref::<ConfigError>().is_some());
		assert!(err.to_string().contains("budget_usd"));
	}
}
