//! The Answer Extractor (§4.9): canonicalizes a model's free-form final
//! text into the integer label a benchmark scores against.
//!
//! Every rule here is grounded in the same tolerant JSON decoder the
//! provider substrate's structured-output parsing uses
//! ([`giant_core::json::parse_anchored_json_object`]) rather than hand
//! rolled brace counting, so a model that wraps its JSON in prose ("Here's
//! my answer: `{...}` I hope this helps!") still extracts cleanly.

use giant_core::json::parse_anchored_json_object;
use serde_json::Value;

/// The result of one extraction attempt: the canonical integer label, or
/// `None` if the text could not be resolved to one, plus the text it was
/// extracted from (kept so a caller can re-run extraction and confirm
/// idempotence — §8's `extract_label(extract_label(x).raw, ..) == extract_label(x)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLabel {
	pub label: Option<i64>,
	pub raw: String,
}

/// Canonicalizes `text` into an integer label for `benchmark_name`, given
/// the benchmark's `options` (empty for free-response benchmarks).
///
/// Dispatch order (§4.9): the `panda` benchmark gets dedicated ISUP-grade
/// JSON rules; a non-empty `options` list gets multiple-choice resolution
/// (letter, index, or containment match); everything else falls back to
/// scanning for the first integer in the text.
#[must_use]
pub fn extract_label(text: &str, benchmark_name: &str, options: &[String]) -> ExtractedLabel {
	let label = if benchmark_name.eq_ignore_ascii_case("panda") {
		extract_panda_label(text)
	} else if !options.is_empty() {
		extract_multiple_choice_label(text, options)
	} else {
		scan_first_integer(text)
	};
	ExtractedLabel { label, raw: text.to_string() }
}

/// `panda` (ISUP grade 0..5, §4.9): requires a JSON object; a missing
/// `isup_grade` key is a failure, `null` means benign (grade 0), and an
/// out-of-range integer is also a failure. Once a JSON object is present,
/// extraction never falls back to scanning the raw text for an integer.
fn extract_panda_label(text: &str) -> Option<i64> {
	let value = parse_anchored_json_object(text)?;
	match value.get("isup_grade") {
		None => None,
		Some(Value::Null) => Some(0),
		Some(other) => other.as_i64().filter(|grade| (0..=5).contains(grade)),
	}
}

/// Multiple-choice resolution (§4.9): a single letter `A`-`D`, a 1-based
/// integer index into `options`, or a case-insensitive containment match
/// against one option's text, tried in that order. Containment matching
/// checks longer options first so a short option's text can't shadow a
/// longer one that also appears in `text` (e.g. "adenocarcinoma" before
/// "carcinoma").
fn extract_multiple_choice_label(text: &str, options: &[String]) -> Option<i64> {
	if let Some(label) = extract_letter_choice(text, options.len()) {
		return Some(label);
	}
	if let Some(label) = extract_integer_in_range(text, options.len()) {
		return Some(label);
	}
	extract_containment_match(text, options)
}

/// Matches a standalone letter token (`A`, `b)`, `(C)`, ...) up to `A +
/// count - 1`, case-insensitively, returning its 1-based index.
fn extract_letter_choice(text: &str, count: usize) -> Option<i64> {
	let max_letter = b'A' + u8::try_from(count.saturating_sub(1)).ok()?;
	for token in tokenize(text) {
		let upper = token.to_ascii_uppercase();
		let mut chars = upper.chars();
		if let (Some(letter), None) = (chars.next(), chars.next()) {
			if letter.is_ascii_alphabetic() && (b'A'..=max_letter).contains(&(letter as u8)) {
				return Some(i64::from(letter as u8 - b'A') + 1);
			}
		}
	}
	None
}

/// Splits `text` on anything that isn't alphanumeric, so punctuation
/// wrapping a letter choice (`(A)`, `B.`, `"C"`) doesn't hide the token.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
	text.split(|c: char| !c.is_alphanumeric()).filter(|token| !token.is_empty())
}

fn extract_integer_in_range(text: &str, count: usize) -> Option<i64> {
	let re = regex::Regex::new(r"-?\d+").expect("static pattern is valid");
	re.find_iter(text).find_map(|candidate| {
		let value: i64 = candidate.as_str().parse().ok()?;
		(1..=count as i64).contains(&value).then_some(value)
	})
}

/// Longest-first case-insensitive substring match against `options`,
/// returning the matching option's 1-based index.
fn extract_containment_match(text: &str, options: &[String]) -> Option<i64> {
	let haystack = text.to_ascii_lowercase();
	let mut ranked: Vec<(usize, &String)> = options.iter().enumerate().collect();
	ranked.sort_by_key(|(_, option)| std::cmp::Reverse(option.len()));
	ranked
		.into_iter()
		.find(|(_, option)| !option.is_empty() && haystack.contains(&option.to_ascii_lowercase()))
		.map(|(index, _)| i64::try_from(index).unwrap_or(0) + 1)
}

fn scan_first_integer(text: &str) -> Option<i64> {
	let re = regex::Regex::new(r"-?\d+").expect("static pattern is valid");
	re.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Resolves a benchmark's ground-truth `answer` cell (§6.1) to the same
/// canonical integer label the Answer Extractor would assign a matching
/// model prediction, so scoring always compares like with like. `answer`
/// may be an integer-as-string, an ISUP grade, or a string label.
#[must_use]
pub fn canonicalize_truth(answer: &str, benchmark_name: &str, options: &[String]) -> Option<i64> {
	let trimmed = answer.trim();
	if let Ok(value) = trimmed.parse::<i64>() {
		if benchmark_name.eq_ignore_ascii_case("panda") {
			return (0..=5).contains(&value).then_some(value);
		}
		if options.is_empty() || (1..=options.len() as i64).contains(&value) {
			return Some(value);
		}
	}
	if !options.is_empty() {
		return options
			.iter()
			.position(|option| option.eq_ignore_ascii_case(trimmed))
			.map(|index| i64::try_from(index).unwrap_or(0) + 1)
			.or_else(|| extract_multiple_choice_label(trimmed, options));
	}
	scan_first_integer(trimmed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn panda_null_isup_grade_is_benign() {
		let result = extract_label(r#"{"isup_grade": null}"#, "panda", &[]);
		assert_eq!(result.label, Some(0));
	}

	#[test]
	fn panda_missing_key_is_a_failure() {
		let result = extract_label(r#"{"reasoning": "looks clean"}"#, "panda", &[]);
		assert_eq!(result.label, None);
	}

	#[test]
	fn panda_present_value_is_parsed() {
		let result = extract_label(r#"{"isup_grade": 3}"#, "panda", &[]);
		assert_eq!(result.label, Some(3));
	}

	#[test]
	fn panda_out_of_range_value_fails_rather_than_clamping() {
		let result = extract_label(r#"{"isup_grade": 9}"#, "panda", &[]);
		assert_eq!(result.label, None);
	}

	#[test]
	fn panda_never_falls_back_to_scanning_the_raw_text() {
		// The JSON object is present but lacks the key; a bare "5" sitting in
		// the surrounding prose must NOT be picked up by a scanning fallback.
		let result = extract_label(r#"Grade 5 overall. {"other_field": 1}"#, "panda", &[]);
		assert_eq!(result.label, None);
	}

	#[test]
	fn tolerant_json_parses_trailing_prose() {
		let text = r#"{"reasoning":"ok","action":{"action_type":"answer","answer_text":"X"}} I hope this helps!"#;
		assert!(parse_anchored_json_object(text).is_some());
	}

	#[test]
	fn multiple_choice_accepts_a_bare_letter() {
		let options = vec!["cat".into(), "dog".into(), "bird".into()];
		let result = extract_label("I believe the answer is B.", "organ_id", &options);
		assert_eq!(result.label, Some(2));
	}

	#[test]
	fn multiple_choice_accepts_an_integer_index() {
		let options = vec!["cat".into(), "dog".into(), "bird".into()];
		let result = extract_label("My answer: 3", "organ_id", &options);
		assert_eq!(result.label, Some(3));
	}

	#[test]
	fn multiple_choice_accepts_a_containment_match() {
		let options = vec!["adenocarcinoma".into(), "squamous cell carcinoma".into()];
		let result = extract_label("This looks like squamous cell carcinoma to me.", "tumor_type", &options);
		assert_eq!(result.label, Some(2));
	}

	#[test]
	fn containment_prefers_the_longer_option_over_a_substring() {
		let options = vec!["carcinoma".into(), "adenocarcinoma".into()];
		let result = extract_label("Final diagnosis: adenocarcinoma", "tumor_type", &options);
		assert_eq!(result.label, Some(2));
	}

	#[test]
	fn string_label_benchmark_maps_via_option_index() {
		let options = vec!["kidney".into(), "liver".into(), "lung".into()];
		let result = extract_label("lung", "organ_classification", &options);
		assert_eq!(result.label, Some(3));
	}

	#[test]
	fn no_options_scans_for_the_first_integer() {
		let result = extract_label("The count was 42 cells per field.", "free_response", &[]);
		assert_eq!(result.label, Some(42));
	}

	#[test]
	fn unresolvable_text_yields_no_label() {
		let result = extract_label("I cannot determine an answer.", "free_response", &[]);
		assert_eq!(result.label, None);
	}

	#[test]
	fn extraction_is_idempotent_over_its_own_raw_field() {
		let first = extract_label(r#"{"isup_grade": 2} thanks"#, "panda", &[]);
		let second = extract_label(&first.raw, "panda", &[]);
		assert_eq!(first.label, second.label);
	}

	#[test]
	fn top_level_array_is_not_a_json_object_for_panda() {
		let result = extract_label("[1, 2, 3]", "panda", &[]);
		assert_eq!(result.label, None);
	}

	#[test]
	fn truth_canonicalization_accepts_a_one_based_integer_string() {
		let options = vec!["cat".into(), "dog".into()];
		assert_eq!(canonicalize_truth("2", "organ_id", &options), Some(2));
	}

	#[test]
	fn truth_canonicalization_accepts_an_isup_grade_string() {
		assert_eq!(canonicalize_truth("0", "panda", &[]), Some(0));
	}

	#[test]
	fn truth_canonicalization_accepts_a_string_label() {
		let options = vec!["kidney".into(), "liver".into(), "lung".into()];
		assert_eq!(canonicalize_truth("Liver", "organ_classification", &options), Some(2));
	}
}
