//! Resumable checkpointing (§6.5): a newline-delimited, append-only record
//! of which item ids an evaluation run has already completed, so a killed
//! and re-launched run with the same `run_id` skips finished work instead
//! of re-scoring it.

use anyhow::{ensure, Result};
use giant_derive::context;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A `run_id` must be usable as a single path component: no separators, no
/// `.`/`..`, not empty. This is the only validation the orchestrator does
/// on a caller-supplied identifier before using it to name a file.
///
/// # Errors
/// Returns an error if `run_id` is empty, contains a path separator, or is
/// `.`/`..`.
pub fn validate_run_id(run_id: &str) -> Result<()> {
	ensure!(!run_id.is_empty(), "run_id must not be empty");
	ensure!(run_id != "." && run_id != "..", "run_id must not be \".\" or \"..\"");
	ensure!(!run_id.contains('/') && !run_id.contains('\\'), "run_id must not contain a path separator");
	Ok(())
}

/// Maps an arbitrary item id to a filesystem-safe fragment: anything other
/// than an ASCII alphanumeric, `-`, or `_` becomes `_`. Used both for the
/// checkpoint's own lookups and for naming per-item trajectory files
/// (`results/trajectories/<safe(item_id)>_run<k>.json`).
#[must_use]
pub fn sanitize_item_id(item_id: &str) -> String {
	item_id
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
		.collect()
}

/// The append-only checkpoint file for one run.
pub struct Checkpoint {
	path: PathBuf,
}

impl Checkpoint {
	/// Opens (without yet creating) the checkpoint file for `run_id` under
	/// `dir`, creating `dir` if needed.
	///
	/// # Errors
	/// Returns an error if `run_id` fails [`validate_run_id`] or `dir`
	/// cannot be created.
	#[context("opening checkpoint directory {}", dir.display())]
	pub fn open(dir: &Path, run_id: &str) -> Result<Self> {
		validate_run_id(run_id)?;
		fs::create_dir_all(dir)?;
		Ok(Self {
			path: dir.join(format!("{run_id}.checkpoint")),
		})
	}

	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Every item id already recorded as completed, for a resumed run to
	/// skip. Returns an empty set if the file doesn't exist yet (a fresh
	/// run).
	///
	/// # Errors
	/// Returns an error if the file exists but cannot be read.
	#[context("reading checkpoint {}", self.path.display())]
	pub fn completed_item_ids(&self) -> Result<HashSet<String>> {
		if !self.path.is_file() {
			return Ok(HashSet::new());
		}
		let contents = fs::read_to_string(&self.path)?;
		Ok(contents.lines().map(str::to_string).filter(|line| !line.is_empty()).collect())
	}

	/// Records `item_id` as completed. Appending (rather than rewriting the
	/// whole file) is what makes a mid-run kill safe: every line already
	/// flushed to disk before the kill stays valid, and `completed_item_ids`
	/// only ever needs to be re-read, never reconstructed.
	///
	/// # Errors
	/// Returns an error if the file cannot be opened for appending or the
	/// write fails.
	#[context("appending to checkpoint {}", self.path.display())]
	pub fn mark_completed(&self, item_id: &str) -> Result<()> {
		let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
		writeln!(file, "{item_id}")?;
		file.flush()?;
		Ok(())
	}
}
