//! Raster types used by the vision pipeline

mod hsv;
pub use hsv::*;

mod raw_image;
pub use raw_image::*;

/// 8-bit sRGB color, as used for painting and overlays
pub type Color = palette::Srgb<u8>;
