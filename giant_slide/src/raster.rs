//! The one concrete production `SlideReader` `giant_slide` ships (§4.0):
//! an adapter over any format the `image` crate can already decode (PNG,
//! JPEG, plain TIFF, ...), synthesizing a pyramid by repeatedly halving the
//! base bitmap. Real whole-slide formats (Aperio SVS, DICOM WSI) stay out
//! of scope — wiring one of those in means implementing [`SlideReader`]
//! directly, or wrapping a real decoder with [`crate::opener::FnSlideOpener`].

use crate::opener::FnSlideOpener;
use crate::reader::SlideReader;
use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use giant_core::geometry::Region;
use giant_core::model::{LevelInfo, SlideMetadata};
use giant_core::{Point, Size};
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// A level below this long side stops the pyramid from subdividing
/// further; there is no benefit to a level the Pyramid Level Selector
/// would never pick over its parent.
const MIN_LEVEL_LONG_SIDE: u32 = 512;

/// Hard cap on how many levels are synthesized, so a very large base image
/// doesn't spin the constructor into an unbounded loop.
const MAX_LEVELS: usize = 12;

/// A whole-image pyramid built once at construction by repeatedly
/// downscaling the decoded base bitmap, held fully in memory.
pub struct RasterSlideReader {
	metadata: SlideMetadata,
	levels: Vec<RgbImage>,
}

impl RasterSlideReader {
	/// Decodes `path` with the `image` crate and builds a synthetic
	/// pyramid over it.
	///
	/// # Errors
	/// Returns an error if `path` cannot be read or decoded into a
	/// supported raster format.
	pub fn open(path: &Path) -> Result<Self> {
		let base = image::open(path).with_context(|| format!("decoding {}", path.display()))?.to_rgb8();
		ensure!(base.width() > 0 && base.height() > 0, "decoded image has zero dimensions");

		let mut levels = vec![base];
		while levels.len() < MAX_LEVELS {
			let current = levels.last().expect("levels always has at least one entry");
			if current.width().max(current.height()) <= MIN_LEVEL_LONG_SIDE {
				break;
			}
			levels.push(halve(current)?);
		}

		let mut downsample = 1.0;
		let infos = levels
			.iter()
			.map(|level| {
				let info = LevelInfo { width: level.width(), height: level.height(), downsample };
				downsample *= 2.0;
				info
			})
			.collect();

		Ok(Self {
			metadata: SlideMetadata {
				path: path.to_path_buf(),
				levels: infos,
				mpp_x: None,
				mpp_y: None,
			},
			levels,
		})
	}
}

fn halve(image: &RgbImage) -> Result<RgbImage> {
	let dst_width = (image.width() / 2).max(1);
	let dst_height = (image.height() / 2).max(1);
	let src = DynamicImage::ImageRgb8(image.clone());
	let mut dst = DynamicImage::new_rgb8(dst_width, dst_height);
	Resizer::new()
		.resize(&src, &mut dst, &ResizeOptions::default().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)))
		.map_err(|err| anyhow::anyhow!("halving image during pyramid synthesis: {err}"))?;
	Ok(dst.into_rgb8())
}

#[async_trait]
impl SlideReader for RasterSlideReader {
	fn metadata(&self) -> &SlideMetadata {
		&self.metadata
	}

	async fn read_region(&self, location: Point, level: usize, size: Size) -> Result<RgbImage> {
		let info = self.metadata.levels.get(level).with_context(|| format!("level {level} out of range (have {})", self.metadata.levels.len()))?;
		let region = Region::new(location.x, location.y, size.width, size.height);
		region.validate(giant_core::Size::new(info.width, info.height)?).map_err(|err| anyhow::anyhow!("{err}"))?;

		let image = &self.levels[level];
		Ok(image::imageops::crop_imm(image, location.x, location.y, size.width, size.height).to_image())
	}
}

/// A [`crate::opener::SlideOpener`] that decodes any `image`-crate-supported
/// raster file via [`RasterSlideReader::open`]. The `giant` binary wires
/// this in by default, since it's the only concrete reader this crate
/// ships.
#[must_use]
pub fn raster_opener() -> FnSlideOpener<fn(&Path) -> Result<Box<dyn SlideReader>>> {
	FnSlideOpener::new(|path: &Path| -> Result<Box<dyn SlideReader>> { Ok(Box::new(RasterSlideReader::open(path)?)) })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::opener::SlideOpener;
	use image::{ImageBuffer, Rgb};

	fn write_png(path: &Path, width: u32, height: u32) {
		let buffer: RgbImage = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
		buffer.save(path).unwrap();
	}

	#[tokio::test]
	async fn opens_a_png_and_reports_its_base_dimensions() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("slide.png");
		write_png(&path, 2048, 1024);

		let reader = RasterSlideReader::open(&path).unwrap();
		assert_eq!(reader.metadata().width(), 2048);
		assert_eq!(reader.metadata().height(), 1024);
		assert_eq!(reader.metadata().levels[0].downsample, 1.0);
	}

	#[tokio::test]
	async fn synthesizes_multiple_levels_for_a_large_image() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("slide.png");
		write_png(&path, 4096, 4096);

		let reader = RasterSlideReader::open(&path).unwrap();
		assert!(reader.metadata().levels.len() > 1);
		let last = reader.metadata().levels.last().unwrap();
		assert!(last.width.max(last.height) <= MIN_LEVEL_LONG_SIDE * 2);
	}

	#[tokio::test]
	async fn a_small_image_has_exactly_one_level() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("slide.png");
		write_png(&path, 200, 100);

		let reader = RasterSlideReader::open(&path).unwrap();
		assert_eq!(reader.metadata().levels.len(), 1);
	}

	#[tokio::test]
	async fn read_region_returns_the_requested_crop() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("slide.png");
		write_png(&path, 300, 300);

		let reader = RasterSlideReader::open(&path).unwrap();
		let region = reader.read_region(Point::new(10, 10), 0, Size::new(20, 20).unwrap()).await.unwrap();
		assert_eq!(region.dimensions(), (20, 20));
	}

	#[test]
	fn missing_file_is_an_error() {
		assert!(RasterSlideReader::open(Path::new("/no/such/file.png")).is_err());
	}

	#[tokio::test]
	async fn raster_opener_builds_a_handle_from_a_path() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("slide.png");
		write_png(&path, 300, 300);

		let handle = raster_opener().open(&path).await.unwrap();
		assert_eq!(handle.path(), path);
		assert_eq!(handle.reader().metadata().width(), 300);
	}
}
