//! Decodes the JSON action object both provider families eventually
//! produce (§4.5.2) into [`giant_core::model::Action`]. Family A's
//! `JsonSchemaProvider` gets this value by tolerantly parsing a text
//! response (see [`giant_core::json`]); Family B's `ToolUseProvider` gets
//! it directly as the tool call's already-parsed `input` object. Either
//! way, the wire shape is the same JSON schema, so the decode step is
//! shared.

use giant_core::error::ProviderError;
use giant_core::geometry::Region;
use giant_core::model::Action;
use serde_json::Value;

/// Decodes one action JSON value, tagged by its `"action"` field
/// (`"crop"`, `"answer"`, or `"conch"`).
///
/// # Errors
/// Returns [`ProviderError::UnknownActionType`] if `"action"` names
/// anything else, or [`ProviderError::Parse`] if the tag is missing or the
/// fields for the named action don't match its expected shape.
pub fn decode_action(value: &Value) -> Result<Action, ProviderError> {
	let raw = || value.to_string();
	let tag = value
		.get("action")
		.and_then(Value::as_str)
		.ok_or_else(|| ProviderError::Parse { raw: raw(), reason: "missing \"action\" field".into() })?;
	match tag {
		"crop" => decode_crop(value).ok_or_else(|| ProviderError::Parse { raw: raw(), reason: "malformed crop action".into() }),
		"answer" => decode_answer(value).ok_or_else(|| ProviderError::Parse { raw: raw(), reason: "malformed answer action".into() }),
		"conch" => decode_conch(value).ok_or_else(|| ProviderError::Parse { raw: raw(), reason: "malformed conch action".into() }),
		other => Err(ProviderError::UnknownActionType { raw_action: other.to_string() }),
	}
}

fn decode_crop(value: &Value) -> Option<Action> {
	let region = value.get("region")?;
	let x = region.get("x")?.as_u64()?.try_into().ok()?;
	let y = region.get("y")?.as_u64()?.try_into().ok()?;
	let width = region.get("width")?.as_u64()?.try_into().ok()?;
	let height = region.get("height")?.as_u64()?.try_into().ok()?;
	let level = value.get("level")?.as_u64()? as usize;
	Some(Action::Crop { region: Region::new(x, y, width, height), level })
}

fn decode_answer(value: &Value) -> Option<Action> {
	let text = value.get("text")?.as_str()?.to_string();
	Some(Action::Answer { text })
}

fn decode_conch(value: &Value) -> Option<Action> {
	let note = value.get("note")?.as_str()?.to_string();
	Some(Action::Conch { note })
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn decodes_a_crop_action() {
		let value = json!({"action": "crop", "region": {"x": 10, "y": 20, "width": 100, "height": 200}, "level": 2});
		let action = decode_action(&value).unwrap();
		assert_eq!(action, Action::Crop { region: Region::new(10, 20, 100, 200), level: 2 });
	}

	#[test]
	fn decodes_an_answer_action() {
		let value = json!({"action": "answer", "text": "ISUP grade 3"});
		let action = decode_action(&value).unwrap();
		assert_eq!(action, Action::Answer { text: "ISUP grade 3".into() });
	}

	#[test]
	fn decodes_a_conch_action() {
		let value = json!({"action": "conch", "note": "checking the margin"});
		let action = decode_action(&value).unwrap();
		assert_eq!(action, Action::Conch { note: "checking the margin".into() });
	}

	#[test]
	fn unknown_action_tag_is_reported_by_name() {
		let value = json!({"action": "teleport"});
		let err = decode_action(&value).unwrap_err();
		assert!(matches!(err, ProviderError::UnknownActionType { raw_action } if raw_action == "teleport"));
	}

	#[test]
	fn missing_action_field_is_a_parse_error() {
		let value = json!({"text": "no tag here"});
		let err = decode_action(&value).unwrap_err();
		assert!(matches!(err, ProviderError::Parse { .. }));
	}

	#[test]
	fn crop_missing_region_is_a_parse_error() {
		let value = json!({"action": "crop", "level": 1});
		let err = decode_action(&value).unwrap_err();
		assert!(matches!(err, ProviderError::Parse { .. }));
	}
}
