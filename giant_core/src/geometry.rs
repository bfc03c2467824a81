//! Integer rectangles in level-0 pixel space, bounds validation, and
//! coordinate mapping between pyramid levels.
//!
//! Every `Region` GIANT passes around — a crop request, a validated model
//! action, a turn's recorded extent — is expressed in **level-0 coordinates**:
//! absolute pixel coordinates at the slide's highest resolution. Mapping into
//! a specific pyramid level happens only at the point of reading pixels
//! ([`level0_to_level`], [`size_at_level`]).

use anyhow::{ensure, Result};
use giant_derive::context;
use std::fmt;

/// A point in level-0 pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
	pub x: u32,
	pub y: u32,
}

impl Point {
	#[must_use]
	pub fn new(x: u32, y: u32) -> Self {
		Self { x, y }
	}
}

/// A width/height pair, always non-zero once constructed via [`Size::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
	pub width: u32,
	pub height: u32,
}

impl Size {
	/// # Errors
	/// Returns an error if either dimension is zero.
	#[context("constructing Size({width}, {height})")]
	pub fn new(width: u32, height: u32) -> Result<Self> {
		ensure!(width > 0, "width must be > 0");
		ensure!(height > 0, "height must be > 0");
		Ok(Self { width, height })
	}

	/// The longer of the two dimensions.
	#[must_use]
	pub fn long_side(&self) -> u32 {
		self.width.max(self.height)
	}
}

/// A nonnegative integer rectangle in level-0 pixel space.
///
/// Invariant: `width > 0 ∧ height > 0 ∧ x ≥ 0 ∧ y ≥ 0`. `x`/`y` are `u32` so
/// non-negativity is structural; width/height are validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

/// Why a [`Region`] failed [`validate`]. One variant per violated constraint;
/// [`validate`] can report several at once via [`OutOfBounds::issues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundsIssue {
	ZeroWidth,
	ZeroHeight,
	RightExceedsBounds { right: u64, bound_width: u32 },
	BottomExceedsBounds { bottom: u64, bound_height: u32 },
}

impl fmt::Display for BoundsIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BoundsIssue::ZeroWidth => write!(f, "width must be > 0"),
			BoundsIssue::ZeroHeight => write!(f, "height must be > 0"),
			BoundsIssue::RightExceedsBounds { right, bound_width } => {
				write!(f, "right edge {right} exceeds slide width {bound_width}")
			}
			BoundsIssue::BottomExceedsBounds { bottom, bound_height } => {
				write!(f, "bottom edge {bottom} exceeds slide height {bound_height}")
			}
		}
	}
}

/// A region failed [`validate`] against a slide's bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfBounds {
	pub region: Region,
	pub bounds: Size,
	pub issues: Vec<BoundsIssue>,
}

impl fmt::Display for OutOfBounds {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"region {:?} is out of bounds for slide {}x{}: {}",
			self.region,
			self.bounds.width,
			self.bounds.height,
			self.issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
		)
	}
}

impl std::error::Error for OutOfBounds {}

impl Region {
	/// Constructs a region without validating it against any slide bounds.
	/// `width`/`height` of `0` are accepted here; use [`validate`] at the
	/// point where slide bounds are known.
	#[must_use]
	pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
		Self { x, y, width, height }
	}

	#[must_use]
	pub fn right(&self) -> u64 {
		u64::from(self.x) + u64::from(self.width)
	}

	#[must_use]
	pub fn bottom(&self) -> u64 {
		u64::from(self.y) + u64::from(self.height)
	}

	#[must_use]
	pub fn size(&self) -> (u32, u32) {
		(self.width, self.height)
	}

	/// A region is in-bounds with respect to `bounds` iff
	/// `right ≤ bounds.width ∧ bottom ≤ bounds.height` (and both dimensions
	/// are positive). Returns a human-readable issue list naming every
	/// violated constraint, not just the first.
	pub fn validate(&self, bounds: Size) -> Result<(), OutOfBounds> {
		let mut issues = Vec::new();
		if self.width == 0 {
			issues.push(BoundsIssue::ZeroWidth);
		}
		if self.height == 0 {
			issues.push(BoundsIssue::ZeroHeight);
		}
		let right = self.right();
		if right > u64::from(bounds.width) {
			issues.push(BoundsIssue::RightExceedsBounds {
				right,
				bound_width: bounds.width,
			});
		}
		let bottom = self.bottom();
		if bottom > u64::from(bounds.height) {
			issues.push(BoundsIssue::BottomExceedsBounds {
				bottom,
				bound_height: bounds.height,
			});
		}
		if issues.is_empty() {
			Ok(())
		} else {
			Err(OutOfBounds {
				region: *self,
				bounds,
				issues,
			})
		}
	}

	/// Clamps this region to `[0, W-1] x [0, H-1]`, then shrinks width/height
	/// so the clamped rectangle fits inside `bounds`, while preserving a
	/// minimum dimension of 1 on each axis.
	///
	/// This is an explicit recovery path (§4.1): callers choose to clamp, it
	/// never happens silently inside [`validate`].
	#[must_use]
	pub fn clamp(&self, bounds: Size) -> Region {
		let max_x = bounds.width.saturating_sub(1);
		let max_y = bounds.height.saturating_sub(1);
		let x = self.x.min(max_x);
		let y = self.y.min(max_y);
		let max_width = bounds.width.saturating_sub(x).max(1);
		let max_height = bounds.height.saturating_sub(y).max(1);
		let width = self.width.clamp(1, max_width);
		let height = self.height.clamp(1, max_height);
		Region { x, y, width, height }
	}
}

/// Maps a level-0 point down into level-`k` coordinates given that level's
/// downsample factor (`≥ 1.0`).
#[must_use]
pub fn level0_to_level(point: Point, downsample: f64) -> Point {
	Point {
		x: (f64::from(point.x) / downsample).floor() as u32,
		y: (f64::from(point.y) / downsample).floor() as u32,
	}
}

/// Maps a level-`k` point back up into level-0 coordinates.
#[must_use]
pub fn level_to_level0(point: Point, downsample: f64) -> Point {
	Point {
		x: (f64::from(point.x) * downsample).floor() as u32,
		y: (f64::from(point.y) * downsample).floor() as u32,
	}
}

/// Maps a level-0 size into level-`k` pixels. Each dimension is rounded down
/// but clamped to at least 1, so a region never collapses to zero pixels.
#[must_use]
pub fn size_at_level(size: (u32, u32), downsample: f64) -> (u32, u32) {
	let w = ((f64::from(size.0) / downsample).floor() as u32).max(1);
	let h = ((f64::from(size.1) / downsample).floor() as u32).max(1);
	(w, h)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn validate_accepts_in_bounds_region() {
		let region = Region::new(10, 10, 100, 100);
		assert!(region.validate(Size::new(200, 200).unwrap()).is_ok());
	}

	#[test]
	fn validate_reports_every_violation() {
		let region = Region::new(190, 190, 0, 50);
		let err = region.validate(Size::new(200, 200).unwrap()).unwrap_err();
		assert!(err.issues.contains(&BoundsIssue::ZeroWidth));
		assert!(err.issues.iter().any(|i| matches!(i, BoundsIssue::BottomExceedsBounds { .. })));
	}

	#[test]
	fn validate_exact_edge_is_in_bounds() {
		let region = Region::new(100, 100, 100, 100);
		assert!(region.validate(Size::new(200, 200).unwrap()).is_ok());
	}

	#[test]
	fn clamp_shrinks_to_fit_and_keeps_minimum_one() {
		let region = Region::new(190, 190, 5000, 5000);
		let clamped = region.clamp(Size::new(200, 200).unwrap());
		assert!(clamped.validate(Size::new(200, 200).unwrap()).is_ok());
		assert!(clamped.width >= 1 && clamped.height >= 1);
	}

	#[test]
	fn clamp_moves_origin_inside_bounds() {
		let region = Region::new(500, 500, 10, 10);
		let clamped = region.clamp(Size::new(200, 200).unwrap());
		assert_eq!(clamped.x, 199);
		assert_eq!(clamped.y, 199);
	}

	#[rstest]
	#[case(1.0)]
	#[case(2.0)]
	#[case(4.0)]
	#[case(7.5)]
	fn round_trip_is_within_one_downsample_per_axis(#[case] downsample: f64) {
		let p = Point::new(12345, 6789);
		let down = level0_to_level(p, downsample);
		let back = level_to_level0(down, downsample);
		let dx = (i64::from(back.x) - i64::from(p.x)).unsigned_abs();
		let dy = (i64::from(back.y) - i64::from(p.y)).unsigned_abs();
		assert!(dx as f64 <= downsample, "dx={dx} downsample={downsample}");
		assert!(dy as f64 <= downsample, "dy={dy} downsample={downsample}");
	}

	#[test]
	fn size_at_level_never_collapses_to_zero() {
		assert_eq!(size_at_level((1, 1), 100.0), (1, 1));
	}
}
