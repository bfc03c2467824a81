//! An in-memory, format-free `SlideReader` used by tests throughout the
//! workspace: no file I/O, no real decoder, just a synthetic pyramid whose
//! pixels encode their own coordinates so a test can assert exactly what
//! region was read.

use crate::reader::SlideReader;
use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use giant_core::geometry::Region;
use giant_core::model::{LevelInfo, SlideMetadata};
use giant_core::{Point, Size};
use image::{Rgb, RgbImage};

/// A synthetic pyramid: level 0 is `width x height`, each subsequent level
/// halves both dimensions (rounding up), doubling the downsample factor.
#[derive(Debug, Clone)]
pub struct MockSlideReader {
	metadata: SlideMetadata,
}

impl MockSlideReader {
	#[must_use]
	pub fn new(width: u32, height: u32, levels: usize) -> Self {
		assert!(levels >= 1, "a pyramid needs at least one level");
		let mut infos = Vec::with_capacity(levels);
		let (mut w, mut h) = (width, height);
		let mut downsample = 1.0;
		for _ in 0..levels {
			infos.push(LevelInfo {
				width: w,
				height: h,
				downsample,
			});
			w = (w / 2).max(1);
			h = (h / 2).max(1);
			downsample *= 2.0;
		}
		Self {
			metadata: SlideMetadata {
				path: "mock://slide".into(),
				levels: infos,
				mpp_x: Some(0.25),
				mpp_y: Some(0.25),
			},
		}
	}
}

#[async_trait]
impl SlideReader for MockSlideReader {
	fn metadata(&self) -> &SlideMetadata {
		&self.metadata
	}

	async fn read_region(&self, location: Point, level: usize, size: Size) -> Result<RgbImage> {
		let info = self
			.metadata
			.levels
			.get(level)
			.with_context(|| format!("level {level} out of range (have {})", self.metadata.levels.len()))?;

		let region = Region::new(location.x, location.y, size.width, size.height);
		region
			.validate(giant_core::Size::new(info.width, info.height)?)
			.map_err(|err| anyhow::anyhow!("{err}"))?;
		ensure!(size.width > 0 && size.height > 0, "requested size must be non-zero");

		let mut image = RgbImage::new(size.width, size.height);
		for y in 0..size.height {
			for x in 0..size.width {
				let gx = location.x.wrapping_add(x);
				let gy = location.y.wrapping_add(y);
				image.put_pixel(
					x,
					y,
					Rgb([(gx % 256) as u8, (gy % 256) as u8, (level as u32 % 256) as u8]),
				);
			}
		}
		Ok(image)
	}
}
