//! Synthetic frames and detectors shared by unit tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::{
    catalog::{Feature, CATALOG},
    geometry::Point2D,
    image::{Color, RawImage},
    markers::{DetectError, Marker, MarkerDetector},
    models,
    normalizer::{CANONICAL_HEIGHT, CANONICAL_WIDTH},
};

/// Lit LED: bright, value above the LED threshold
pub const LED_ON: Color = Color::new(255, 255, 255);
/// Lit display segment: green, hue 60
pub const SEGMENT_ON: Color = Color::new(0, 255, 0);

/// Black frame of the canonical size
pub fn canonical_frame() -> RawImage {
    RawImage::new(CANONICAL_WIDTH, CANONICAL_HEIGHT)
}

/// Markers whose configured corners lie exactly on `corners`
pub fn markers_at(corners: [Point2D; 4]) -> Vec<Marker> {
    let calibration = models::Calibration::default();

    calibration
        .marker_ids
        .iter()
        .zip(calibration.corner_indices.iter())
        .zip(corners.iter())
        .map(|((&id, &index), &corner)| {
            // 10 pixel square, with the panel corner at `index`
            let mut square = [
                Point2D::new(0., 0.),
                Point2D::new(10., 0.),
                Point2D::new(10., 10.),
                Point2D::new(0., 10.),
            ];
            let anchor = square[index];
            for point in square.iter_mut() {
                point.x += corner.x - anchor.x;
                point.y += corner.y - anchor.y;
            }

            Marker {
                id,
                corners: square,
            }
        })
        .collect()
}

/// Markers mapping the canonical frame onto itself
pub fn canonical_markers() -> Vec<Marker> {
    markers_at([
        Point2D::new(0., 0.),
        Point2D::new(CANONICAL_WIDTH as f32, 0.),
        Point2D::new(CANONICAL_WIDTH as f32, CANONICAL_HEIGHT as f32),
        Point2D::new(0., CANONICAL_HEIGHT as f32),
    ])
}

/// Paint the region of a catalog feature
pub fn paint(image: &mut RawImage, feature: Feature, color: Color) {
    let region = CATALOG.get(feature).region;
    image.fill_rect(
        region.origin.x,
        region.origin.y,
        region.size.width,
        region.size.height,
        color,
    );
}

/// Light the given segments (a to g) of a digit
pub fn paint_segments(image: &mut RawImage, digit: &[Feature; 7], segments: &str) {
    for (feature, name) in digit.iter().zip("abcdefg".chars()) {
        if segments.contains(name) {
            paint(image, *feature, SEGMENT_ON);
        }
    }
}

/// Detector returning fixed markers and counting its invocations
pub struct CountingDetector {
    markers: Vec<Marker>,
    pub count: Arc<AtomicUsize>,
}

impl CountingDetector {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self {
            markers,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MarkerDetector for CountingDetector {
    fn detect(&self, _image: &RawImage) -> Result<Vec<Marker>, DetectError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(self.markers.clone())
    }
}
