//! The one concrete, production-facing piece `giant_slide` ships beyond the
//! trait itself (§4.0): a thin adapter that turns any `SlideReader`-producing
//! closure into a reusable opener the evaluation orchestrator can hold as a
//! trait object, without the crate depending on a specific image-format
//! decoder. Wiring an actual format (OpenSlide, a pyramidal-TIFF reader, ...)
//! in means supplying the closure; `giant_slide` itself never links one.

use crate::reader::{SlideHandle, SlideReader};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Opens a path into a [`SlideHandle`], hiding whatever concrete
/// [`SlideReader`] backs it.
#[async_trait]
pub trait SlideOpener: Send + Sync {
	/// # Errors
	/// Returns an error if `path` cannot be opened or decoded as a slide.
	async fn open(&self, path: &Path) -> Result<SlideHandle>;
}

/// Adapts a synchronous `Fn(&Path) -> Result<Box<dyn SlideReader>>` factory
/// into a [`SlideOpener`], for callers whose decoder construction doesn't
/// need to await anything (the common case: opening a file handle and
/// parsing a pyramid directory).
pub struct FnSlideOpener<F> {
	factory: F,
}

impl<F> FnSlideOpener<F>
where
	F: Fn(&Path) -> Result<Box<dyn SlideReader>> + Send + Sync,
{
	pub fn new(factory: F) -> Self {
		Self { factory }
	}
}

#[async_trait]
impl<F> SlideOpener for FnSlideOpener<F>
where
	F: Fn(&Path) -> Result<Box<dyn SlideReader>> + Send + Sync,
{
	async fn open(&self, path: &Path) -> Result<SlideHandle> {
		let reader = (self.factory)(path)?;
		Ok(SlideHandle::new(path, reader))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mock::MockSlideReader;
	use std::path::PathBuf;

	#[tokio::test]
	async fn fn_opener_builds_a_handle_from_its_factory() {
		let opener = FnSlideOpener::new(|_path: &Path| -> Result<Box<dyn SlideReader>> { Ok(Box::new(MockSlideReader::new(512, 512, 2))) });
		let handle = opener.open(Path::new("/slides/demo.svs")).await.unwrap();
		assert_eq!(handle.path(), PathBuf::from("/slides/demo.svs"));
		assert_eq!(handle.reader().metadata().levels.len(), 2);
	}

	#[tokio::test]
	async fn fn_opener_propagates_factory_errors() {
		let opener = FnSlideOpener::new(|_path: &Path| -> Result<Box<dyn SlideReader>> { Err(anyhow::anyhow!("unsupported format")) });
		let result = opener.open(Path::new("/slides/bad.svs")).await;
		assert!(result.is_err());
	}
}
