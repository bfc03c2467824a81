//! The `SlideReader` trait: a format-agnostic interface for pulling pixel
//! regions out of a whole-slide image pyramid, and the handle that owns one.
//!
//! A concrete reader knows how to decode one file format (Aperio SVS,
//! generic pyramidal TIFF, DICOM WSI, ...) into level-0-addressed regions.
//! Everything above this crate — the Pyramid Level Selector, the Crop
//! Engine, the Agent Runner — only ever talks to `dyn SlideReader`.

use anyhow::Result;
use async_trait::async_trait;
use giant_core::model::SlideMetadata;
use giant_core::{Point, Size};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Format-agnostic access to one slide's pixel pyramid.
///
/// Implementations are expected to be cheap to clone/share (an `Arc<dyn
/// SlideReader>` or similar) since the Agent Runner issues many reads
/// against the same slide over the course of a run.
#[async_trait]
pub trait SlideReader: Send + Sync {
	/// Static facts about this slide: its pyramid levels and, when the
	/// format records it, physical pixel size.
	fn metadata(&self) -> &SlideMetadata;

	/// Reads a `size`-pixel region at `level`, with `location` given in
	/// that level's own coordinate space (not level-0).
	///
	/// # Errors
	/// Returns an error if `level` is out of range, the requested region
	/// falls outside the level's bounds, or decoding the underlying format
	/// fails.
	async fn read_region(&self, location: Point, level: usize, size: Size) -> Result<RgbImage>;
}

/// Owns a `dyn SlideReader` alongside the path it was opened from, and logs
/// when the slide is released so callers can see file handles / decoders
/// actually get torn down.
pub struct SlideHandle {
	path: PathBuf,
	reader: Box<dyn SlideReader>,
}

impl SlideHandle {
	#[must_use]
	pub fn new(path: impl Into<PathBuf>, reader: Box<dyn SlideReader>) -> Self {
		Self {
			path: path.into(),
			reader,
		}
	}

	#[must_use]
	pub fn path(&self) -> &Path {
		&self.path
	}

	#[must_use]
	pub fn reader(&self) -> &dyn SlideReader {
		self.reader.as_ref()
	}
}

impl Drop for SlideHandle {
	fn drop(&mut self) {
		log::debug!("releasing slide {}", self.path.display());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::MockSlideReader;

	#[test]
	fn handle_exposes_the_path_it_was_opened_with() {
		let reader = MockSlideReader::new(1024, 768, 3);
		let handle = SlideHandle::new("/slides/demo.svs", Box::new(reader));
		assert_eq!(handle.path(), Path::new("/slides/demo.svs"));
	}
}
