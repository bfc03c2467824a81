//! Downscaling crops to the size a provider expects, without ever enlarging
//! them.
//!
//! The Crop Engine reads pixels at the coarsest pyramid level that still
//! covers the requested region at native resolution or better, then shrinks
//! the result down to the provider's target long side. Shrinking only: a
//! crop whose native resolution is already below the target is left alone
//! rather than blown up into blur.

use anyhow::Result;
use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use giant_derive::context;
use image::{DynamicImage, RgbImage};

/// Resizes `image` so its longer side is `target_long_side`, preserving
/// aspect ratio. If the image is already at or below the target, it is
/// returned unchanged — this function only ever shrinks.
#[context("downscaling {}x{} image to target long side {target_long_side}", image.width(), image.height())]
pub fn downscale_to_fit(image: &RgbImage, target_long_side: u32) -> Result<RgbImage> {
	let (width, height) = (image.width(), image.height());
	let long_side = width.max(height);
	if long_side <= target_long_side {
		return Ok(image.clone());
	}

	let scale = f64::from(target_long_side) / f64::from(long_side);
	let dst_width = ((f64::from(width) * scale).round() as u32).max(1);
	let dst_height = ((f64::from(height) * scale).round() as u32).max(1);

	let src = DynamicImage::ImageRgb8(image.clone());
	let mut dst = DynamicImage::new_rgb8(dst_width, dst_height);
	Resizer::new().resize(
		&src,
		&mut dst,
		&ResizeOptions::default().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
	)?;

	Ok(dst.into_rgb8())
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::Rgb;

	#[test]
	fn shrinks_the_long_side_to_the_target() {
		let image = RgbImage::from_pixel(2000, 1000, Rgb([10, 20, 30]));
		let out = downscale_to_fit(&image, 500).unwrap();
		assert_eq!(out.width(), 500);
		assert_eq!(out.height(), 250);
	}

	#[test]
	fn never_enlarges_an_already_small_image() {
		let image = RgbImage::from_pixel(200, 100, Rgb([1, 2, 3]));
		let out = downscale_to_fit(&image, 1000);
		let out = out.unwrap();
		assert_eq!(out.dimensions(), (200, 100));
	}

	#[test]
	fn exact_match_is_a_no_op() {
		let image = RgbImage::from_pixel(500, 500, Rgb([9, 9, 9]));
		let out = downscale_to_fit(&image, 500).unwrap();
		assert_eq!(out.dimensions(), (500, 500));
	}
}
