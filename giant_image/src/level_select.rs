//! Picks which pyramid level to read a crop from.
//!
//! Levels are addressed coarsest-last: `levels[0]` is always native
//! resolution (`downsample == 1.0`), and `downsample` increases
//! monotonically with the index. Given the requested region's long side in
//! level-0 pixels and the provider's target long side, [`select_level`]
//! first picks the level whose native resolution is closest to a
//! bias-inflated target (so it leans toward a level a little larger than
//! strictly necessary), then applies an undershoot correction so the Crop
//! Engine never has to enlarge what it reads.

use giant_core::model::LevelInfo;

/// The default bias applied to the target long side before nearest-level
/// search (§4.2): `target_native = S / bias`. A bias below 1.0 inflates the
/// search target, favoring a level with some headroom over the provider's
/// requested size.
pub const DEFAULT_BIAS: f64 = 0.85;

/// Chooses the level whose native long side is nearest to
/// `target_long_side / bias`, breaking ties toward the finer (smaller-index)
/// level, then corrects any undershoot by stepping to a finer level until
/// the native size is `>= target_long_side` or level 0 is reached.
#[must_use]
pub fn select_level(levels: &[LevelInfo], region_long_side_level0: f64, target_long_side: u32, bias: f64) -> usize {
	debug_assert!(!levels.is_empty());
	let target = f64::from(target_long_side);
	let target_native = target / bias;

	let mut chosen = 0usize;
	let mut best_diff = f64::INFINITY;
	for (index, level) in levels.iter().enumerate() {
		let native_size = region_long_side_level0 / level.downsample;
		let diff = (native_size - target_native).abs();
		if diff < best_diff {
			best_diff = diff;
			chosen = index;
		}
	}

	while chosen > 0 {
		let native_size = region_long_side_level0 / levels[chosen].downsample;
		if native_size < target {
			chosen -= 1;
		} else {
			break;
		}
	}
	chosen
}
