//! Family A (§4.5.6): a structured-output-via-JSON-schema provider. Request
//! bodies mirror a Responses-style API — a top-level `instructions` field
//! for the system prompt, an `input` array of role-tagged content blocks,
//! and a `text.format` JSON schema the remote model is constrained to
//! produce. The 1000px target size and the flat per-image cost add-on both
//! follow from `ProviderFamily::JsonSchema` (§4.5.6).

use crate::http;
use crate::message::{conversation_messages, extract_system_prompt, message_content_blocks};
use crate::provider::{Provider, ProviderRegistry};
use crate::retry::RetryPolicy;
use crate::{action_wire, cost};
use async_trait::async_trait;
use giant_core::config::ProviderConfig;
use giant_core::error::ProviderError;
use giant_core::model::{Message, Role, StepResponse};
use serde_json::{json, Value};
use std::sync::Arc;

fn role_str(role: Role) -> &'static str {
	match role {
		Role::System => "system",
		Role::User => "user",
		Role::Assistant => "assistant",
	}
}

/// The JSON schema every `JsonSchemaProvider` request constrains its
/// response to: a reasoning string plus the tagged action union
/// [`action_wire::decode_action`] already knows how to read.
fn step_response_schema() -> Value {
	json!({
		"type": "object",
		"properties": {
			"reasoning": {"type": "string"},
			"action": {"type": "string", "enum": ["crop", "answer", "conch"]},
			"region": {
				"type": "object",
				"properties": {
					"x": {"type": "integer"},
					"y": {"type": "integer"},
					"width": {"type": "integer"},
					"height": {"type": "integer"}
				}
			},
			"level": {"type": "integer"},
			"text": {"type": "string"},
			"note": {"type": "string"}
		},
		"required": ["reasoning", "action"]
	})
}

/// A Family A (structured JSON output) vision-LLM backend.
pub struct JsonSchemaProvider {
	config: ProviderConfig,
	client: reqwest::Client,
	registry: Arc<ProviderRegistry>,
	retry_policy: RetryPolicy,
}

impl JsonSchemaProvider {
	/// # Errors
	/// Returns a [`ProviderError::Transport`] if the HTTP client fails to
	/// build (see [`http::build_client`]).
	pub fn new(
		config: ProviderConfig,
		request_timeout: std::time::Duration,
		registry: Arc<ProviderRegistry>,
		retry_policy: RetryPolicy,
	) -> Result<Self, ProviderError> {
		Ok(Self {
			client: http::build_client(request_timeout)?,
			config,
			registry,
			retry_policy,
		})
	}

	fn build_body(&self, messages: &[Message]) -> Value {
		let input: Vec<Value> = conversation_messages(messages)
			.into_iter()
			.map(|message| json!({"role": role_str(message.role), "content": message_content_blocks(message)}))
			.collect();
		json!({
			"model": self.config.model,
			"instructions": extract_system_prompt(messages),
			"input": input,
			"text": {
				"format": {
					"type": "json_schema",
					"name": "step_response",
					"schema": step_response_schema(),
					"strict": true,
				}
			}
		})
	}

	async fn send(&self, body: &Value) -> Result<Value, ProviderError> {
		let api_key = self.config.read_api_key()?;
		let response = self
			.client
			.post(&self.config.endpoint)
			.bearer_auth(api_key)
			.json(body)
			.send()
			.await
			.map_err(|err| ProviderError::Transport(err.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body_text = response.text().await.unwrap_or_default();
			return Err(http::classify_status(&self.config.endpoint, &self.config.model, status, &body_text));
		}
		response.json::<Value>().await.map_err(|err| ProviderError::Transport(err.to_string()))
	}
}

#[async_trait]
impl Provider for JsonSchemaProvider {
	async fn generate_response(&self, messages: &[Message]) -> Result<StepResponse, ProviderError> {
		let body = self.build_body(messages);
		let state = self.registry.state_for(&self.config);
		let response =
			crate::provider::through_resilience_stack(&state, &self.retry_policy, &self.config.endpoint, &self.config.model, || {
				self.send(&body)
			})
			.await?;

		let raw_text = response
			.get("output_text")
			.and_then(Value::as_str)
			.ok_or_else(|| ProviderError::Parse { raw: response.to_string(), reason: "response has no output_text field".into() })?
			.to_string();

		let parsed: Value = giant_core::json::parse_leading_json(&raw_text)
			.ok_or_else(|| ProviderError::Parse { raw: raw_text.clone(), reason: "output_text is not valid JSON".into() })?;
		let action = action_wire::decode_action(&parsed)?;

		let raw_usage = cost::RawUsage {
			prompt_tokens: response.pointer("/usage/input_tokens").and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok()),
			completion_tokens: response
				.pointer("/usage/output_tokens")
				.and_then(Value::as_u64)
				.and_then(|v| u32::try_from(v).ok()),
		};
		let usage = cost::compute_usage(&self.config.endpoint, &self.config.model, raw_usage, &self.config.price_table, messages)?;

		Ok(StepResponse { action, raw_text, usage })
	}

	fn target_size(&self) -> u32 {
		self.config.family.target_size()
	}

	fn price_table(&self) -> &giant_core::config::PriceTable {
		&self.config.price_table
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use giant_core::config::{CircuitBreakerConfig, ImageTerm, PriceTable, ProviderFamily};

	fn config() -> ProviderConfig {
		ProviderConfig {
			family: ProviderFamily::JsonSchema,
			endpoint: "https://api.example.com/v1/responses".into(),
			model: "vision-1".into(),
			api_key_env: "GIANT_TEST_JSON_SCHEMA_KEY".into(),
			rpm: 60,
			circuit_breaker: CircuitBreakerConfig::default(),
			price_table: PriceTable { input_price_per_1k: 0.003, output_price_per_1k: 0.015, image_term: ImageTerm::FixedPerImage(0.01) },
		}
	}

	#[test]
	fn target_size_follows_the_family() {
		assert_eq!(ProviderFamily::JsonSchema.target_size(), 1000);
	}

	#[test]
	fn request_body_carries_the_system_prompt_as_instructions() {
		std::env::set_var("GIANT_TEST_JSON_SCHEMA_KEY", "sk-test");
		let provider = JsonSchemaProvider::new(
			config(),
			std::time::Duration::from_secs(30),
			Arc::new(ProviderRegistry::new()),
			RetryPolicy::default(),
		)
		.unwrap();
		let messages = vec![Message::text(Role::System, "Describe the tissue."), Message::text(Role::User, "Begin.")];
		let body = provider.build_body(&messages);
		assert_eq!(body["instructions"], "Describe the tissue.");
		assert_eq!(body["input"][0]["role"], "user");
		assert_eq!(body["text"]["format"]["type"], "json_schema");
	}

	#[test]
	fn step_response_schema_requires_reasoning_and_action() {
		let schema = step_response_schema();
		let required = schema["required"].as_array().unwrap();
		assert!(required.iter().any(|v| v == "reasoning"));
		assert!(required.iter().any(|v| v == "action"));
	}
}
