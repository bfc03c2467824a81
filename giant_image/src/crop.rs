//! The Crop Engine (§4.3): given a level-0 region and a provider's target
//! long side, pick the right pyramid level, enforce a memory ceiling on the
//! raw read, and shrink (never enlarge) the result before JPEG-encoding it.

use crate::level_select::{select_level, DEFAULT_BIAS};
use crate::{jpeg, resize};
use giant_core::error::CropError;
use giant_core::geometry::{level0_to_level, size_at_level, Region};
use giant_core::model::{CroppedImage, SlideMetadata};
use giant_core::{Point, Size};
use giant_slide::SlideReader;

/// Everything the Crop Engine needs beyond the region itself: the
/// provider's target long side and the three knobs §4.3 names explicitly.
#[derive(Debug, Clone, Copy)]
pub struct CropRequest {
	pub region: Region,
	pub target_long_side: u32,
	/// Pyramid Level Selector bias (§4.2); `None` uses [`DEFAULT_BIAS`].
	pub bias: Option<f64>,
	pub jpeg_quality: u8,
	/// Memory guard on the level-k read, in pixels along the long side.
	/// `0` disables the check.
	pub max_read_dimension: u32,
}

impl CropRequest {
	#[must_use]
	pub fn new(region: Region, target_long_side: u32) -> Self {
		Self {
			region,
			target_long_side,
			bias: None,
			jpeg_quality: 85,
			max_read_dimension: 10_000,
		}
	}

	fn bias(&self) -> f64 {
		self.bias.unwrap_or(DEFAULT_BIAS)
	}
}

/// Runs the full Crop Engine pipeline against `reader`.
///
/// # Errors
/// Returns [`CropError::OutOfBounds`] if `request.region` falls outside the
/// slide's level-0 bounds, [`CropError::RegionTooLarge`] if the level-k read
/// would exceed `max_read_dimension`, or [`CropError::ReadError`] /
/// [`CropError::ResizeFailed`] / [`CropError::EncodingFailed`] if a later
/// pipeline stage fails.
pub async fn crop(reader: &dyn SlideReader, request: CropRequest) -> Result<CroppedImage, CropError> {
	let metadata: &SlideMetadata = reader.metadata();
	let bounds = Size { width: metadata.width(), height: metadata.height() };
	request.region.validate(bounds).map_err(CropError::OutOfBounds)?;

	let region_long_side = f64::from(request.region.width.max(request.region.height));
	let level = select_level(&metadata.levels, region_long_side, request.target_long_side, request.bias());
	let downsample = metadata.levels[level].downsample;

	let (read_width, read_height) = size_at_level(request.region.size(), downsample);
	if request.max_read_dimension > 0 && read_width.max(read_height) > request.max_read_dimension {
		return Err(CropError::RegionTooLarge {
			width: read_width,
			height: read_height,
			level,
			max: request.max_read_dimension,
		});
	}

	let level_location = level0_to_level(Point::new(request.region.x, request.region.y), downsample);
	let read_size = Size::new(read_width, read_height).map_err(|e| CropError::ReadError(e.to_string()))?;
	let raw = reader
		.read_region(level_location, level, read_size)
		.await
		.map_err(|e| CropError::ReadError(e.to_string()))?;

	let native_long = raw.width().max(raw.height());
	let scaled = resize::downscale_to_fit(&raw, request.target_long_side).map_err(|e| CropError::ResizeFailed(e.to_string()))?;
	let scale_factor = if native_long == 0 { 1.0 } else { f64::from(scaled.width().max(scaled.height())) / f64::from(native_long) };

	let jpeg_bytes = jpeg::encode(&scaled, request.jpeg_quality).map_err(|e| CropError::EncodingFailed(e.to_string()))?;

	Ok(CroppedImage {
		jpeg_bytes,
		width: scaled.width(),
		height: scaled.height(),
		region: request.region,
		level,
		scale_factor,
		overlay_applied: false,
	})
}
