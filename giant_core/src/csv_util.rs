//! Parsing helpers for the benchmark CSV's loosely-typed `options` column
//! (§6.1): a JSON array, a Python-style literal list, or a pipe-delimited
//! string, all meaning the same thing — an ordered list of choice labels.

/// Parses one `options` cell into its choice strings, trying each accepted
/// shape in turn. Returns an empty vector for a blank cell (no options —
/// the item is free-response, not multiple-choice).
#[must_use]
pub fn parse_options_field(raw: &str) -> Vec<String> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Vec::new();
	}

	if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(trimmed) {
		return items.into_iter().map(value_to_plain_string).collect();
	}

	if let Some(body) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
		return parse_literal_list_body(body);
	}

	trimmed.split('|').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn value_to_plain_string(value: serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s,
		other => other.to_string(),
	}
}

/// Splits a Python-literal list's body (`'a', 'b', "c"`) on top-level
/// commas, stripping a single layer of matching quotes from each item.
fn parse_literal_list_body(body: &str) -> Vec<String> {
	body
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(strip_matching_quotes)
		.collect()
}

fn strip_matching_quotes(item: &str) -> String {
	let bytes = item.as_bytes();
	if bytes.len() >= 2 {
		let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
		if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
			return item[1..item.len() - 1].to_string();
		}
	}
	item.to_string()
}
