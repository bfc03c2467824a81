//! Builds the full-slide [`Thumbnail`] every agent run seeds Turn 0 with:
//! the coarsest pyramid level that still covers `thumbnail_max`, downscaled
//! to fit, with the Axis-Guide Overlay burned in before JPEG encoding.

use crate::level_select::{select_level, DEFAULT_BIAS};
use crate::overlay::{draw_axis_guide, load_font};
use crate::{jpeg, resize};
use anyhow::Result;
use giant_core::geometry::{size_at_level, Region};
use giant_core::model::{SlideMetadata, Thumbnail};
use giant_core::{Point, Size};
use giant_slide::SlideReader;

/// Reads the whole slide at the coarsest level that still covers
/// `thumbnail_max`, shrinks it to fit, draws the axis guide, and encodes
/// the result as JPEG at `jpeg_quality`.
///
/// # Errors
/// Propagates [`giant_core::error::CropError::ReadError`] /
/// [`giant_core::error::CropError::ResizeFailed`] /
/// [`giant_core::error::CropError::EncodingFailed`] from the underlying
/// pipeline stages, or a font-loading error when `strict_font_check` is set
/// and no scalable font is available (§4.4).
pub async fn build_thumbnail(
	reader: &dyn SlideReader,
	thumbnail_max: u32,
	strict_font_check: bool,
	jpeg_quality: u8,
) -> Result<Thumbnail> {
	let metadata: &SlideMetadata = reader.metadata();
	let slide_long_side = f64::from(metadata.width().max(metadata.height()));
	let level = select_level(&metadata.levels, slide_long_side, thumbnail_max, DEFAULT_BIAS);
	let downsample = metadata.levels[level].downsample;

	let (read_width, read_height) = size_at_level((metadata.width(), metadata.height()), downsample);
	let read_size = Size::new(read_width, read_height)?;
	let raw = reader.read_region(Point::new(0, 0), level, read_size).await?;

	let mut scaled = resize::downscale_to_fit(&raw, thumbnail_max)?;

	let thumbnail_downsample = slide_long_side / f64::from(scaled.width().max(scaled.height()));
	let font = load_font(strict_font_check)?;
	draw_axis_guide(&mut scaled, thumbnail_downsample, &font);

	let jpeg_bytes = jpeg::encode(&scaled, jpeg_quality)?;
	Ok(Thumbnail {
		jpeg_bytes,
		width: scaled.width(),
		height: scaled.height(),
	})
}

/// Computes the in-bounds level-0 extent a thumbnail spans: the full slide.
#[must_use]
pub fn full_slide_region(metadata: &SlideMetadata) -> Region {
	Region::new(0, 0, metadata.width(), metadata.height())
}

#[cfg(test)]
mod tests {
	use super::*;
	use giant_slide::MockSlideReader;

	#[tokio::test]
	async fn thumbnail_never_exceeds_its_max_long_side() {
		let slide = MockSlideReader::new(100_000, 70_000, 6);
		let thumb = build_thumbnail(&slide, 512, false, 85).await.unwrap();
		assert!(thumb.width.max(thumb.height) <= 512);
	}

	#[tokio::test]
	async fn thumbnail_bytes_decode_back_to_the_reported_dimensions() {
		let slide = MockSlideReader::new(20_000, 20_000, 4);
		let thumb = build_thumbnail(&slide, 256, false, 85).await.unwrap();
		let decoded = jpeg::decode(&thumb.jpeg_bytes).unwrap();
		assert_eq!(decoded.dimensions(), (thumb.width, thumb.height));
	}

	#[test]
	fn full_slide_region_spans_the_whole_slide() {
		let slide = MockSlideReader::new(1234, 5678, 1);
		let region = full_slide_region(slide.metadata());
		assert_eq!((region.width, region.height), (1234, 5678));
	}
}
