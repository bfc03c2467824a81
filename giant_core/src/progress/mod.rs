//! Progress reporting for the evaluation orchestrator's item loop (§5).
//!
//! Conditionally compiles one of two [`ProgressTrait`] implementations: a
//! real terminal bar when the `cli` feature is enabled (the `giant` binary),
//! and a no-op drain everywhere else (library callers, tests, benches) so
//! library code can report progress unconditionally without forcing a
//! terminal dependency on every caller.
//!
//! # Examples
//!
//! ```rust
//! use giant_core::progress::get_progress_bar;
//!
//! let mut progress = get_progress_bar("Scoring", 100);
//! progress.set_position(50);
//! progress.inc(10);
//! progress.finish();
//! ```

mod traits;
pub use traits::ProgressTrait;

#[cfg(feature = "cli")]
mod progress_bar;
mod progress_drain;

/// Creates a progress indicator for a task of `max_value` units, labeled
/// `message`. Returns a real terminal bar under the `cli` feature, or a
/// no-op drain otherwise.
#[must_use]
pub fn get_progress_bar(message: &str, max_value: u64) -> Box<dyn ProgressTrait> {
	#[cfg(feature = "cli")]
	let mut progress: Box<dyn ProgressTrait> = Box::new(progress_bar::ProgressBar::new());
	#[cfg(not(feature = "cli"))]
	let mut progress: Box<dyn ProgressTrait> = Box::new(progress_drain::ProgressDrain::new());
	progress.init(message, max_value);
	progress
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn factory_produces_a_usable_indicator() {
		let mut progress = get_progress_bar("items", 10);
		progress.set_position(3);
		progress.inc(2);
		progress.finish();
		progress.remove();
	}
}
