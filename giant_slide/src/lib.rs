//! Slide pyramid access: the [`SlideReader`] trait every format adapter
//! implements, the [`SlideHandle`] that owns one, and a synthetic
//! [`MockSlideReader`] for tests that don't need a real decoder.

pub mod mock;
pub mod opener;
pub mod raster;
pub mod reader;

pub use mock::MockSlideReader;
pub use opener::{FnSlideOpener, SlideOpener};
pub use raster::RasterSlideReader;
pub use reader::{SlideHandle, SlideReader};
