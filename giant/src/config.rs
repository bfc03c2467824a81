//! Loads the JSON configuration file the `run`/`benchmark`/`check-data`
//! subcommands take via `--config` (§2.3: "an optional model-pricing
//! registry loaded from a JSON file at startup"): an [`AgentConfig`] plus,
//! for multi-item commands, the [`OrchestratorConfig`] governing
//! concurrency and resumability.

use anyhow::{Context, Result};
use giant_core::config::{AgentConfig, OrchestratorConfig};
use giant_core::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// The on-disk shape of a `--config` file: always an [`AgentConfig`],
/// with an [`OrchestratorConfig`] present only for commands that run more
/// than one item (`benchmark`, `check-data`).
#[derive(Debug, Clone, Deserialize)]
pub struct GiantConfig {
	pub agent: AgentConfig,
	#[serde(default)]
	pub orchestrator: Option<OrchestratorConfig>,
}

impl GiantConfig {
	/// Reads and parses `path`, then validates the nested `agent` config (and
	/// `orchestrator`, if present).
	///
	/// # Errors
	/// Returns a [`ConfigError`] if the file cannot be read, is not valid
	/// JSON matching this shape, or a nested config fails its own
	/// `validate()`.
	pub fn load(path: &Path) -> Result<Self> {
		let contents = std::fs::read_to_string(path).map_err(|err| ConfigError(format!("reading config file {}: {err}", path.display())))?;
		let config: Self = serde_json::from_str(&contents).map_err(|err| ConfigError(format!("parsing config file {}: {err}", path.display())))?;
		config.agent.validate().map_err(|err| ConfigError(format!("{err:#}")))?;
		if let Some(orchestrator) = &config.orchestrator {
			orchestrator.validate().map_err(|err| ConfigError(format!("{err:#}")))?;
		}
		Ok(config)
	}

	/// Returns the validated [`OrchestratorConfig`], or a [`ConfigError`] if
	/// the file didn't carry one (required by the multi-item commands).
	pub fn require_orchestrator(&self) -> Result<OrchestratorConfig> {
		self.orchestrator.clone().ok_or_else(|| ConfigError("config file has no \"orchestrator\" section".into())).context("loading orchestrator config").map_err(Into::into)
	}
}
