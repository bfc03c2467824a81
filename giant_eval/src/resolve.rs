//! Slide path resolution (§6.2): turns a benchmark item's `image_path` into
//! an actual file on disk, trying a fixed order of candidates before
//! giving up.

use giant_core::model::BenchmarkItem;
use std::fmt;
use std::path::{Path, PathBuf};

/// None of the resolution candidates for an item's slide existed on disk.
#[derive(Debug, Clone)]
pub struct SlideNotFound {
	pub item_id: String,
	pub tried: Vec<PathBuf>,
}

impl fmt::Display for SlideNotFound {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "could not resolve a slide file for item {}; tried: ", self.item_id)?;
		let paths: Vec<String> = self.tried.iter().map(|p| p.display().to_string()).collect();
		write!(f, "{}", paths.join(", "))
	}
}

impl std::error::Error for SlideNotFound {}

/// Resolves `item.slide_path` against `wsi_root`, trying in order:
/// `wsi_root/image_path`, `wsi_root/benchmark_name/image_path`, and a glob
/// fallback that scans `wsi_root/benchmark_name/` (and, when `file_id` is
/// set, `wsi_root/benchmark_name/file_id/`) for a file whose name starts
/// with the requested path's file stem.
///
/// # Errors
/// Returns [`SlideNotFound`] naming every candidate tried, if none exist.
pub fn resolve_slide_path(wsi_root: &Path, item: &BenchmarkItem) -> Result<PathBuf, SlideNotFound> {
	let mut tried = Vec::new();

	let direct = wsi_root.join(&item.slide_path);
	tried.push(direct.clone());
	if direct.is_file() {
		return Ok(direct);
	}

	let nested = wsi_root.join(&item.benchmark).join(&item.slide_path);
	tried.push(nested.clone());
	if nested.is_file() {
		return Ok(nested);
	}

	let mut search_dirs = vec![wsi_root.join(&item.benchmark)];
	if let Some(file_id) = &item.file_id {
		search_dirs.push(wsi_root.join(&item.benchmark).join(file_id));
	}
	let stem = item.slide_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
	for dir in &search_dirs {
		tried.push(dir.join(format!("{stem}.*")));
		if let Some(found) = find_by_stem(dir, stem) {
			return Ok(found);
		}
	}

	Err(SlideNotFound { item_id: item.id.clone(), tried })
}

/// Scans `dir` (one level, non-recursive) for a file whose stem matches
/// `stem`, for datasets that nest slides one directory per `file_id` but
/// don't otherwise match `image_path` exactly.
fn find_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
	if stem.is_empty() {
		return None;
	}
	let entries = std::fs::read_dir(dir).ok()?;
	for entry in entries.flatten() {
		let path = entry.path();
		if path.is_file() && path.file_stem().and_then(|s| s.to_str()) == Some(stem) {
			return Some(path);
		}
	}
	None
}
