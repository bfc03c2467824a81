//! Tolerant JSON extraction shared by the provider substrate's structured
//! output parsing (§4.5.2) and the Answer Extractor (§4.9).
//!
//! Vision models routinely wrap a JSON value in prose ("Here's my answer:
//! `{...}` I hope this helps!"). Naive brace-counting breaks on nested
//! objects and string-embedded braces; instead this module leans on
//! `serde_json`'s own streaming deserializer, which already knows how to
//! find the end of one JSON value and simply stop there.

use serde::de::DeserializeOwned;

/// Parses the first complete JSON value at the start of `text`, ignoring
/// any trailing content (prose, more JSON, whitespace). Returns `None` if
/// no valid value starts at the very beginning of `text`.
#[must_use]
pub fn parse_leading_json<T: DeserializeOwned>(text: &str) -> Option<T> {
	let mut stream = serde_json::Deserializer::from_str(text.trim_start()).into_iter::<T>();
	stream.next().and_then(Result::ok)
}

/// Finds the first `{` in `text` and parses the first complete JSON value
/// from there, ignoring trailing content. Returns `None` if there is no
/// `{`, the leading value fails to parse, or it parses to something other
/// than a JSON object (an array or primitive at top level counts as "no
/// JSON object" per §4.9).
#[must_use]
pub fn parse_anchored_json_object(text: &str) -> Option<serde_json::Value> {
	let start = text.find('{')?;
	let value: serde_json::Value = parse_leading_json(&text[start..])?;
	value.is_object().then_some(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;
	use serde_json::json;

	#[derive(Debug, Deserialize, PartialEq)]
	struct Sample {
		a: u32,
	}

	#[test]
	fn parses_leading_value_and_ignores_trailing_prose() {
		let text = r#"{"a": 1} I hope this helps!"#;
		assert_eq!(parse_leading_json::<Sample>(text), Some(Sample { a: 1 }));
	}

	#[test]
	fn returns_none_when_text_does_not_start_with_json() {
		let text = r#"Sure, here you go: {"a": 1}"#;
		assert_eq!(parse_leading_json::<Sample>(text), None);
	}

	#[test]
	fn anchored_parse_skips_leading_prose() {
		let text = r#"Sure, here you go: {"a": 1} thanks!"#;
		assert_eq!(parse_anchored_json_object(text), Some(json!({"a": 1})));
	}

	#[test]
	fn anchored_parse_rejects_top_level_arrays() {
		let text = r#"here: [1, 2, 3]"#;
		assert_eq!(parse_anchored_json_object(text), None);
	}

	#[test]
	fn anchored_parse_returns_none_without_any_brace() {
		assert_eq!(parse_anchored_json_object("no json here"), None);
	}

	#[test]
	fn tolerant_json_extraction_is_idempotent() {
		let raw = r#"{"a": 1} trailing"#;
		let first = parse_anchored_json_object(raw).unwrap();
		let second = parse_anchored_json_object(&first.to_string()).unwrap();
		assert_eq!(first, second);
	}
}
