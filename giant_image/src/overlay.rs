//! Axis-Guide Overlay: grid lines and level-0 coordinate labels burned into
//! a crop before it's sent to the model, so the model can reason about
//! where inside the slide a region sits.
//!
//! Label rendering prefers a real scalable font (probed from a short list
//! of common system font paths) rendered via `ab_glyph`/`imageproc`. When
//! none is found, a small embedded bitmap font is used instead so the
//! overlay still works on a machine with no fonts installed; set
//! `strict_font_check` to turn that fallback into a hard error instead.

use anyhow::{bail, Result};
use ab_glyph::{FontArc, PxScale};
use imageproc::drawing::draw_text_mut;
use image::{Rgb, RgbImage};

/// Common locations for a scalable font across Linux distributions and
/// macOS. The first one that exists and parses is used.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
	"/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
	"/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
	"/usr/share/fonts/TTF/DejaVuSans.ttf",
	"/usr/share/fonts/dejavu/DejaVuSans.ttf",
	"/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// The guide color, a high-contrast yellow that reads over both stained
/// tissue and white background.
const GUIDE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// What label rendering falls back to when no scalable font is available.
pub enum Font {
	Scalable(FontArc),
	Bitmap,
}

/// Probes [`SYSTEM_FONT_CANDIDATES`] for a usable scalable font.
///
/// # Errors
/// Returns an error only when `strict_font_check` is `true` and no
/// candidate font was found; otherwise falls back to [`Font::Bitmap`] and
/// logs a warning.
pub fn load_font(strict_font_check: bool) -> Result<Font> {
	for path in SYSTEM_FONT_CANDIDATES {
		if let Ok(bytes) = std::fs::read(path) {
			if let Ok(font) = FontArc::try_from_slice(&bytes) {
				log::debug!("loaded axis-guide font from {path}");
				return Ok(Font::Scalable(font));
			}
		}
	}
	if strict_font_check {
		bail!("no scalable font found among {SYSTEM_FONT_CANDIDATES:?} and strict_font_check is enabled");
	}
	log::warn!("no scalable font found on this system; falling back to the embedded bitmap font for axis labels");
	Ok(Font::Bitmap)
}

/// How strongly the guide color is blended into the pixel underneath it,
/// so the pathology stays legible through the grid (§4.4: "rendered in a
/// contrasting color (semi-transparent)").
const GUIDE_ALPHA: f32 = 0.45;

/// Draws exactly four equally spaced interior grid lines per axis, each
/// labeled with the **level-0 pixel coordinate** it corresponds to
/// (`thumbnail coordinate * downsample`, per §4.4). `downsample` is the
/// thumbnail's own downsample factor (`max(W,H) / max(tw,th)`, §3); the
/// thumbnail always starts at level-0 origin `(0, 0)`, so no region offset
/// is needed.
///
/// The four lines per axis sit at `step, 2*step, 3*step, 4*step` where
/// `step = dimension / 5` — never at the image edges, which is what makes
/// them "interior".
pub fn draw_axis_guide(image: &mut RgbImage, downsample: f64, font: &Font) {
	let (width, height) = image.dimensions();
	let step_x = width / 5;
	let step_y = height / 5;

	if step_x > 0 {
		for i in 1..=4u32 {
			let x = i * step_x;
			blend_line(image, (x as f32, 0.0), (x as f32, height.saturating_sub(1) as f32));
			let level0_x = (f64::from(x) * downsample) as u32;
			draw_label(image, (x as i32 + 2, 2), &level0_x.to_string(), font);
		}
	}

	if step_y > 0 {
		for i in 1..=4u32 {
			let y = i * step_y;
			blend_line(image, (0.0, y as f32), (width.saturating_sub(1) as f32, y as f32));
			let level0_y = (f64::from(y) * downsample) as u32;
			draw_label(image, (2, y as i32 + 2), &level0_y.to_string(), font);
		}
	}
}

/// Alpha-blends [`GUIDE_COLOR`] into the pixels along one axis-aligned
/// segment, rather than overwriting them outright.
fn blend_line(image: &mut RgbImage, start: (f32, f32), end: (f32, f32)) {
	let (width, height) = image.dimensions();
	let is_vertical = (start.0 - end.0).abs() < f32::EPSILON;
	if is_vertical {
		let x = start.0.round() as i64;
		if x < 0 || x >= i64::from(width) {
			return;
		}
		let (y0, y1) = (start.1.min(end.1) as u32, start.1.max(end.1) as u32);
		for y in y0..=y1.min(height.saturating_sub(1)) {
			blend_pixel(image, x as u32, y);
		}
	} else {
		let y = start.1.round() as i64;
		if y < 0 || y >= i64::from(height) {
			return;
		}
		let (x0, x1) = (start.0.min(end.0) as u32, start.0.max(end.0) as u32);
		for x in x0..=x1.min(width.saturating_sub(1)) {
			blend_pixel(image, x, y as u32);
		}
	}
}

fn blend_pixel(image: &mut RgbImage, x: u32, y: u32) {
	let existing = *image.get_pixel(x, y);
	let blended = Rgb(std::array::from_fn(|c| {
		let under = f32::from(existing.0[c]);
		let guide = f32::from(GUIDE_COLOR.0[c]);
		(under * (1.0 - GUIDE_ALPHA) + guide * GUIDE_ALPHA).round() as u8
	}));
	image.put_pixel(x, y, blended);
}

fn draw_label(image: &mut RgbImage, origin: (i32, i32), text: &str, font: &Font) {
	match font {
		Font::Scalable(font) => {
			draw_text_mut(image, GUIDE_COLOR, origin.0, origin.1, PxScale::from(14.0), font, text);
		}
		Font::Bitmap => draw_bitmap_text(image, origin, text, GUIDE_COLOR, 2),
	}
}

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;

/// A minimal 3x5 bitmap font covering the characters axis labels use:
/// digits and a comma-shaped separator.
fn glyph_for(ch: char) -> Option<[[u8; 3]; 5]> {
	Some(match ch {
		'0' => [[1, 1, 1], [1, 0, 1], [1, 0, 1], [1, 0, 1], [1, 1, 1]],
		'1' => [[0, 1, 0], [1, 1, 0], [0, 1, 0], [0, 1, 0], [1, 1, 1]],
		'2' => [[1, 1, 1], [0, 0, 1], [1, 1, 1], [1, 0, 0], [1, 1, 1]],
		'3' => [[1, 1, 1], [0, 0, 1], [0, 1, 1], [0, 0, 1], [1, 1, 1]],
		'4' => [[1, 0, 1], [1, 0, 1], [1, 1, 1], [0, 0, 1], [0, 0, 1]],
		'5' => [[1, 1, 1], [1, 0, 0], [1, 1, 1], [0, 0, 1], [1, 1, 1]],
		'6' => [[1, 1, 1], [1, 0, 0], [1, 1, 1], [1, 0, 1], [1, 1, 1]],
		'7' => [[1, 1, 1], [0, 0, 1], [0, 1, 0], [0, 1, 0], [0, 1, 0]],
		'8' => [[1, 1, 1], [1, 0, 1], [1, 1, 1], [1, 0, 1], [1, 1, 1]],
		'9' => [[1, 1, 1], [1, 0, 1], [1, 1, 1], [0, 0, 1], [1, 1, 1]],
		',' => [[0, 0, 0], [0, 0, 0], [0, 0, 0], [0, 1, 0], [1, 0, 0]],
		_ => return None,
	})
}

fn draw_bitmap_text(image: &mut RgbImage, origin: (i32, i32), text: &str, color: Rgb<u8>, scale: i32) {
	let (width, height) = (image.width() as i32, image.height() as i32);
	let mut cursor_x = origin.0;
	for ch in text.chars() {
		if let Some(glyph) = glyph_for(ch) {
			for (row, cells) in glyph.iter().enumerate() {
				for (col, &on) in cells.iter().enumerate() {
					if on == 0 {
						continue;
					}
					let px0 = cursor_x + col as i32 * scale;
					let py0 = origin.1 + row as i32 * scale;
					for dy in 0..scale {
						for dx in 0..scale {
							let (px, py) = (px0 + dx, py0 + dy);
							if px >= 0 && py >= 0 && px < width && py < height {
								image.put_pixel(px as u32, py as u32, color);
							}
						}
					}
				}
			}
		}
		cursor_x += (GLYPH_WIDTH + 1) * scale;
	}
	let _ = GLYPH_HEIGHT;
}
