//! Diagnostic overlay of the catalog regions on a normalized frame

use std::path::Path;

use thiserror::Error;

use crate::{
    catalog::{Catalog, Region},
    classifier::FeatureVector,
    image::{Color, RawImage},
};

pub const ACTIVE_COLOR: Color = Color::new(0, 255, 0);
pub const INACTIVE_COLOR: Color = Color::new(255, 0, 0);
pub const REFERENCE_COLOR: Color = Color::new(0, 0, 255);

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("error encoding overlay: {0}")]
    Image(#[from] ::image::ImageError),
}

fn outline(image: &mut RawImage, region: &Region, color: Color) {
    let (x, y) = (region.origin.x, region.origin.y);
    let (w, h) = (region.size.width, region.size.height);
    if w == 0 || h == 0 {
        return;
    }

    image.fill_rect(x, y, w, 1, color);
    image.fill_rect(x, y + h - 1, w, 1, color);
    image.fill_rect(x, y, 1, h, color);
    image.fill_rect(x + w - 1, y, 1, h, color);
}

/// Copy of `frame` with every catalog region outlined according to its verdict
pub fn draw(frame: &RawImage, features: &FeatureVector, catalog: &Catalog) -> RawImage {
    let mut image = frame.clone();

    for entry in catalog.iter() {
        let color = if entry.rule.is_none() {
            REFERENCE_COLOR
        } else if features.is_active(entry.feature) {
            ACTIVE_COLOR
        } else {
            INACTIVE_COLOR
        };

        outline(&mut image, &entry.region, color);
    }

    image
}

/// Write an overlay to a PNG file
pub fn save(image: &RawImage, path: impl AsRef<Path>) -> Result<(), OverlayError> {
    image
        .to_rgb_image()
        .save_with_format(path, ::image::ImageFormat::Png)?;
    Ok(())
}
