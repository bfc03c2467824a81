//! Image processing for GIANT: the Pyramid Level Selector, the Crop Engine,
//! and the Axis-Guide Overlay (§4.2-§4.4).
//!
//! This crate turns a level-0 [`giant_core::geometry::Region`] plus a
//! provider's target long side into an encoded JPEG crop, and burns
//! labeled coordinate grid lines onto the full-slide thumbnail every run
//! starts from.

pub mod crop;
pub mod jpeg;
pub mod level_select;
pub mod overlay;
pub mod resize;
pub mod thumbnail;

pub use crop::{crop as crop_region, CropRequest};
pub use level_select::{select_level, DEFAULT_BIAS};
pub use overlay::{draw_axis_guide, load_font, Font};
pub use thumbnail::build_thumbnail;
