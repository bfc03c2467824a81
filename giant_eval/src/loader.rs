//! Loads a benchmark CSV (§6.1) into [`BenchmarkItem`]s.
//!
//! The header-bearing CSV is tolerant of two naming conventions for the
//! item identifier column (`item_id` or `benchmark_id`) and of three shapes
//! for the `options` cell ([`giant_core::csv_util::parse_options_field`]).
//! Rows marked `is_valid = false` are dropped before they ever reach the
//! orchestrator.

use anyhow::{Context, Result};
use giant_core::csv_util::parse_options_field;
use giant_core::model::{BenchmarkItem, MetricType};
use giant_derive::context;
use std::path::{Path, PathBuf};

/// Reads and parses every valid row of `path` into a [`BenchmarkItem`].
///
/// # Errors
/// Returns an error if the file cannot be opened, has no header row, or a
/// row is missing a required column (`benchmark_name`/`item_id`/
/// `image_path`/`answer`).
#[context("loading benchmark CSV from {}", path.display())]
pub fn load_benchmark_csv(path: &Path) -> Result<Vec<BenchmarkItem>> {
	let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path).with_context(|| format!("opening {}", path.display()))?;
	let headers = reader.headers()?.clone();
	let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

	let id_column = column("item_id").or_else(|| column("benchmark_id")).context("CSV has neither an item_id nor benchmark_id column")?;
	let benchmark_column = column("benchmark_name").context("CSV is missing a benchmark_name column")?;
	let path_column = column("image_path").context("CSV is missing an image_path column")?;
	let prompt_column = column("prompt");
	let options_column = column("options");
	let answer_column = column("answer").context("CSV is missing an answer column")?;
	let metric_column = column("metric_type");
	let file_id_column = column("file_id");
	let is_valid_column = column("is_valid");

	let mut items = Vec::new();
	for (row_index, record) in reader.records().enumerate() {
		let record = record.with_context(|| format!("reading row {row_index} of {}", path.display()))?;
		if is_valid_column.is_some_and(|index| !cell_is_truthy(record.get(index).unwrap_or("true"))) {
			continue;
		}

		let benchmark = record.get(benchmark_column).unwrap_or_default().trim().to_string();
		let id = record.get(id_column).unwrap_or_default().trim().to_string();
		let slide_path: PathBuf = record.get(path_column).unwrap_or_default().trim().into();
		let answer = record.get(answer_column).unwrap_or_default().trim().to_string();
		anyhow::ensure!(!id.is_empty(), "row {row_index} has an empty item id");
		anyhow::ensure!(!benchmark.is_empty(), "row {row_index} has an empty benchmark_name");

		let options = options_column.and_then(|index| record.get(index)).map(parse_options_field).unwrap_or_default();
		let question = prompt_column.and_then(|index| record.get(index)).unwrap_or_default().trim().to_string();
		let metric_type = metric_column
			.and_then(|index| record.get(index))
			.map(parse_metric_type)
			.unwrap_or(MetricType::Accuracy);
		let file_id = file_id_column.and_then(|index| record.get(index)).map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

		items.push(BenchmarkItem {
			id,
			benchmark,
			slide_path,
			question,
			choices: (!options.is_empty()).then_some(options),
			answer,
			metric_type,
			file_id,
		});
	}
	Ok(items)
}

fn parse_metric_type(raw: &str) -> MetricType {
	match raw.trim().to_ascii_lowercase().as_str() {
		"balanced_accuracy" | "balanced-accuracy" => MetricType::BalancedAccuracy,
		_ => MetricType::Accuracy,
	}
}

fn cell_is_truthy(raw: &str) -> bool {
	!matches!(raw.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no" | "")
}
