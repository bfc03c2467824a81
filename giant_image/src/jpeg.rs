//! JPEG encoding for crops and thumbnails sent to a provider, and decoding
//! for replaying a persisted [`crate::Trajectory`](giant_core::model::Trajectory).
//!
//! Only 8-bit RGB is supported; every image this crate produces already
//! went through [`crate::resize::downscale_to_fit`] and never carries an
//! alpha channel.

use anyhow::Result;
use giant_derive::context;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, RgbImage};

/// Encodes `image` as a JPEG at `quality` (1..=100; values `>= 100` are
/// clamped to 100, which `image`'s encoder treats as maximum quality, not
/// true lossless).
#[context("encoding {}x{} image as JPEG (q={quality})", image.width(), image.height())]
pub fn encode(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
	let quality = quality.min(100);
	let mut buffer = Vec::new();
	JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
		image.as_raw(),
		image.width(),
		image.height(),
		image::ExtendedColorType::Rgb8,
	)?;
	Ok(buffer)
}

/// Decodes a JPEG byte stream back into an [`RgbImage`].
#[context("decoding JPEG image ({} bytes)", bytes.len())]
pub fn decode(bytes: &[u8]) -> Result<RgbImage> {
	let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?;
	Ok(image.into_rgb8())
}
