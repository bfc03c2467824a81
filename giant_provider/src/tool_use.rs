//! Family B (§4.5.6): a tool-use-with-forced-invocation provider. Request
//! bodies mirror a Messages-style API — a top-level `system` field, a
//! `messages` array of role-tagged content blocks, and a single declared
//! tool the model is forced to call via `tool_choice`. The 500px target
//! size and the per-megapixel cost follow from `ProviderFamily::ToolUse`
//! (§4.5.6).

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

const TOOL_NAME: &str = "submit_step";

fn role_str(role: Role) -> &'static str {
	match role {
		Role::System => "system",
		Role::User => "user",
		Role::Assistant => "assistant",
	}
}

fn submit_step_tool() -> Value {
	json!({
		"name": TOOL_NAME,
		"description": "Submit this step's decision: crop a region, give a final answer, or jot a scratchpad note.",
		"input_schema": {
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
		}
	})
}

/// A Family B (forced tool-use) vision-LLM backend.
pub struct ToolUseProvider {
	config: ProviderConfig,
	client: reqwest::Client,
	registry: Arc<ProviderRegistry>,
	retry_policy: RetryPolicy,
}

impl ToolUseProvider {
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
		let wire_messages: Vec<Value> = conversation_messages(messages)
			.into_iter()
			.map(|message| json!({"role": role_str(message.role), "content": message_content_blocks(message)}))
			.collect();
		json!({
			"model": self.config.model,
			"system": extract_system_prompt(messages),
			"messages": wire_messages,
			"tools": [submit_step_tool()],
			"tool_choice": {"type": "tool", "name": TOOL_NAME},
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

/// Finds the `tool_use` content block named [`TOOL_NAME`] in a Messages-API
/// response and returns its `input` object.
///
/// # Errors
/// Returns [`ProviderError::Parse`] if no matching tool call is present. If
/// the provider returned `input` as a stringified JSON fragment rather than
/// a parsed object, it is parsed explicitly here; an invalid string raises
/// `Parse` with the JSON error as its reason, never silently discarded.
fn extract_tool_input(response: &Value) -> Result<Value, ProviderError> {
	let blocks = response
		.pointer("/content")
		.and_then(Value::as_array)
		.ok_or_else(|| ProviderError::Parse { raw: response.to_string(), reason: "response has no content blocks".into() })?;

	let tool_call = blocks
		.iter()
		.find(|block| block.get("type").and_then(Value::as_str) == Some("tool_use") && block.get("name").and_then(Value::as_str) == Some(TOOL_NAME))
		.ok_or_else(|| ProviderError::Parse { raw: response.to_string(), reason: format!("no tool_use block named {TOOL_NAME}") })?;

	match tool_call.get("input") {
		Some(value) if value.is_object() => Ok(value.clone()),
		Some(Value::String(fragment)) => serde_json::from_str(fragment)
			.map_err(|err| ProviderError::Parse { raw: fragment.clone(), reason: format!("tool input string is not valid JSON: {err}") }),
		_ => Err(ProviderError::Parse { raw: tool_call.to_string(), reason: "tool call has no usable input".into() }),
	}
}

#[async_trait]
impl Provider for ToolUseProvider {
	async fn generate_response(&self, messages: &[Message]) -> Result<StepResponse, ProviderError> {
		let body = self.build_body(messages);
		let state = self.registry.state_for(&self.config);
		let response =
			crate::provider::through_resilience_stack(&state, &self.retry_policy, &self.config.endpoint, &self.config.model, || {
				self.send(&body)
			})
			.await?;

		let input = extract_tool_input(&response)?;
		let raw_text = input.to_string();
		let action = action_wire::decode_action(&input)?;

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
	use serde_json::json;

	fn config() -> ProviderConfig {
		ProviderConfig {
			family: ProviderFamily::ToolUse,
			endpoint: "https://api.example.com/v1/messages".into(),
			model: "vision-2".into(),
			api_key_env: "GIANT_TEST_TOOL_USE_KEY".into(),
			rpm: 60,
			circuit_breaker: CircuitBreakerConfig::default(),
			price_table: PriceTable { input_price_per_1k: 0.003, output_price_per_1k: 0.015, image_term: ImageTerm::PerMegapixel(0.02) },
		}
	}

	#[test]
	fn target_size_follows_the_family() {
		assert_eq!(ProviderFamily::ToolUse.target_size(), 500);
	}

	#[test]
	fn request_body_forces_the_submit_step_tool() {
		std::env::set_var("GIANT_TEST_TOOL_USE_KEY", "sk-test");
		let provider =
			ToolUseProvider::new(config(), std::time::Duration::from_secs(30), Arc::new(ProviderRegistry::new()), RetryPolicy::default())
				.unwrap();
		let messages = vec![Message::text(Role::System, "Describe the tissue."), Message::text(Role::User, "Begin.")];
		let body = provider.build_body(&messages);
		assert_eq!(body["tool_choice"]["name"], TOOL_NAME);
		assert_eq!(body["messages"][0]["role"], "user");
	}

	#[test]
	fn extracts_a_parsed_object_tool_input() {
		let response = json!({
			"content": [{"type": "tool_use", "name": TOOL_NAME, "input": {"reasoning": "ok", "action": "answer", "text": "grade 3"}}]
		});
		let input = extract_tool_input(&response).unwrap();
		assert_eq!(input["action"], "answer");
	}

	#[test]
	fn extracts_a_stringified_json_tool_input() {
		let response = json!({
			"content": [{"type": "tool_use", "name": TOOL_NAME, "input": "{\"reasoning\": \"ok\", \"action\": \"conch\", \"note\": \"hm\"}"}]
		});
		let input = extract_tool_input(&response).unwrap();
		assert_eq!(input["action"], "conch");
	}

	#[test]
	fn an_invalid_stringified_fragment_is_a_parse_error_not_a_panic() {
		let response = json!({
			"content": [{"type": "tool_use", "name": TOOL_NAME, "input": "not json at all"}]
		});
		let err = extract_tool_input(&response).unwrap_err();
		assert!(matches!(err, ProviderError::Parse { .. }));
	}

	#[test]
	fn missing_tool_call_is_a_parse_error() {
		let response = json!({"content": [{"type": "text", "text": "I changed my mind"}]});
		let err = extract_tool_input(&response).unwrap_err();
		assert!(matches!(err, ProviderError::Parse { .. }));
	}
}
