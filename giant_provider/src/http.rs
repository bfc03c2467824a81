//! The HTTP transport both provider families send requests over: a
//! keep-alive-tuned `reqwest::Client` built once per provider and a
//! predicate distinguishing retryable transport failures from the rest.

use giant_core::error::ProviderError;
use std::time::Duration;

/// Builds the shared client one [`crate::provider::Provider`] reuses for
/// every call: keep-alive on, rustls for TLS, timeout from
/// [`giant_core::config::AgentConfig::request_timeout`].
///
/// # Errors
/// Returns a [`ProviderError::Transport`] if the underlying TLS backend
/// fails to initialize.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
	reqwest::Client::builder()
		.tcp_keepalive(Duration::from_secs(60))
		.timeout(timeout)
		.build()
		.map_err(|err| ProviderError::Transport(err.to_string()))
}

/// Whether a `reqwest::Error` is worth retrying: connection, timeout, or
/// truncated-body failures are transient; everything else (a malformed
/// URL, a decoding bug) will fail the same way again.
#[must_use]
pub fn is_retryable_transport_error(err: &reqwest::Error) -> bool {
	err.is_connect() || err.is_timeout() || err.is_body()
}

/// Maps a failed HTTP response into the `ProviderError` variant its status
/// code implies.
#[must_use]
pub fn classify_status(provider: &str, model: &str, status: reqwest::StatusCode, body: &str) -> ProviderError {
	if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
		ProviderError::InvalidCredentials { provider: provider.to_string(), model: model.to_string() }
	} else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
		ProviderError::RateLimited { provider: provider.to_string(), model: model.to_string() }
	} else {
		ProviderError::Transport(format!("HTTP {status}: {body}"))
	}
}
