//! Builds a concrete [`Provider`] from a [`ProviderConfig`] (§4.5.6):
//! dispatches on [`ProviderFamily`] to pick the matching wire
//! implementation, the one place outside `giant_provider` itself that
//! needs to know both concrete types exist.

use giant_core::config::ProviderConfig;
use giant_core::error::ProviderError;
use giant_derive::context;
use giant_provider::retry::RetryPolicy;
use giant_provider::{JsonSchemaProvider, Provider, ProviderRegistry, ToolUseProvider};
use std::sync::Arc;
use std::time::Duration;

/// Constructs the `Provider` implementation matching `config.family`,
/// sharing `registry`'s per-`(provider, model)` resilience state with every
/// other provider built against the same registry.
///
/// # Errors
/// Returns a [`ProviderError::Transport`] if the underlying HTTP client
/// fails to build.
#[context("building provider for model {}", config.model)]
pub fn build_provider(
	config: ProviderConfig,
	request_timeout: Duration,
	registry: Arc<ProviderRegistry>,
	retry_policy: RetryPolicy,
) -> Result<Arc<dyn Provider>, ProviderError> {
	match config.family {
		giant_core::config::ProviderFamily::JsonSchema => {
			Ok(Arc::new(JsonSchemaProvider::new(config, request_timeout, registry, retry_policy)?))
		}
		giant_core::config::ProviderFamily::ToolUse => Ok(Arc::new(ToolUseProvider::new(config, request_timeout, registry, retry_policy)?)),
	}
}
