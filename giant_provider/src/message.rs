//! Conversions shared by both provider families (§4.5.3): pulling the
//! system instructions out of the message list, since both wire formats
//! take the system prompt as a distinct top-level field rather than a
//! message with a `system` role; and tagging each content block with the
//! role-aware `"input_*"`/`"output_*"` type the remote APIs expect.

use giant_core::model::{Message, MessageContent, Role};
use serde_json::{json, Value};

/// Concatenates the text of every system-role message's text content,
/// joined by blank lines, for use as the wire request's top-level
/// instructions field. System messages never carry images (the Prompt
/// Builder only ever puts text there), so non-text content is skipped
/// rather than erroring.
#[must_use]
pub fn extract_system_prompt(messages: &[Message]) -> String {
	messages
		.iter()
		.filter(|message| message.role == Role::System)
		.flat_map(|message| &message.content)
		.filter_map(|content| match content {
			MessageContent::Text { text } => Some(text.as_str()),
			MessageContent::Image { .. } => None,
		})
		.collect::<Vec<_>>()
		.join("\n\n")
}

/// The non-system messages, in order, for wire encoding.
#[must_use]
pub fn conversation_messages(messages: &[Message]) -> Vec<&Message> {
	messages.iter().filter(|message| message.role != Role::System).collect()
}

/// Tags one content block with the role-aware type both wire formats use:
/// `user`/`system` content is tagged `input_text`/`input_image`, assistant
/// text is tagged `output_text` (§4.5.3 — the mapping is bit-exact; the
/// remote API rejects a call that crosses the wrong variant). Assistant
/// messages never carry images, since only the user ever submits a crop.
#[must_use]
pub fn content_block(role: Role, content: &MessageContent) -> Value {
	match (role, content) {
		(Role::Assistant, MessageContent::Text { text }) => json!({"type": "output_text", "text": text}),
		(_, MessageContent::Text { text }) => json!({"type": "input_text", "text": text}),
		(_, MessageContent::Image { media_type, data }) => {
			json!({"type": "input_image", "image_url": format!("data:{media_type};base64,{data}")})
		}
	}
}

/// Builds the wire content array for one non-system message.
#[must_use]
pub fn message_content_blocks(message: &Message) -> Vec<Value> {
	message.content.iter().map(|content| content_block(message.role, content)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn concatenates_multiple_system_messages() {
		let messages = vec![
			Message::text(Role::System, "You are a pathologist."),
			Message::text(Role::System, "Answer in JSON."),
			Message::text(Role::User, "look here"),
		];
		let prompt = extract_system_prompt(&messages);
		assert_eq!(prompt, "You are a pathologist.\n\nAnswer in JSON.");
	}

	#[test]
	fn no_system_messages_yields_empty_string() {
		let messages = vec![Message::text(Role::User, "hi")];
		assert_eq!(extract_system_prompt(&messages), "");
	}

	#[test]
	fn conversation_messages_excludes_system_role() {
		let messages = vec![Message::text(Role::System, "sys"), Message::text(Role::User, "hi")];
		let conversation = conversation_messages(&messages);
		assert_eq!(conversation.len(), 1);
		assert_eq!(conversation[0].role, Role::User);
	}

	#[test]
	fn user_text_is_tagged_input_text() {
		let block = content_block(Role::User, &MessageContent::Text { text: "hi".into() });
		assert_eq!(block["type"], "input_text");
	}

	#[test]
	fn assistant_text_is_tagged_output_text() {
		let block = content_block(Role::Assistant, &MessageContent::Text { text: "ok".into() });
		assert_eq!(block["type"], "output_text");
	}

	#[test]
	fn images_are_always_tagged_input_image() {
		let content = MessageContent::Image { media_type: "image/jpeg".into(), data: "Zm9v".into() };
		let block = content_block(Role::User, &content);
		assert_eq!(block["type"], "input_image");
		assert_eq!(block["image_url"], "data:image/jpeg;base64,Zm9v");
	}
}
