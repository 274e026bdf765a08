//! Geometric normalization of camera frames
//!
//! Four fiducial markers are stuck to the corners of the panel. Once found, one corner of each
//! is mapped onto the corners of the canonical rectangle, which yields a perspective-corrected
//! image where every catalog region sits at a fixed location.

use std::cell::OnceCell;

use crate::{
    geometry::{warp_perspective, Homography, Point2D},
    image::{HsvImage, RawImage},
    markers::{Marker, MarkerDetector},
    models,
};

/// Width of the normalized image. One pixel is about 0.1 mm on the panel.
pub const CANONICAL_WIDTH: u32 = 530;
/// Height of the normalized image
pub const CANONICAL_HEIGHT: u32 = 1150;

/// Corners of the canonical rectangle, clockwise from the top left
const CANONICAL_CORNERS: [Point2D; 4] = [
    Point2D::new(0., 0.),
    Point2D::new(CANONICAL_WIDTH as f32, 0.),
    Point2D::new(CANONICAL_WIDTH as f32, CANONICAL_HEIGHT as f32),
    Point2D::new(0., CANONICAL_HEIGHT as f32),
];

/// Perspective-corrected image of the panel
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    image: RawImage,
    hsv: OnceCell<HsvImage>,
}

impl NormalizedFrame {
    pub fn new(image: RawImage) -> Self {
        Self {
            image,
            hsv: OnceCell::new(),
        }
    }

    pub fn image(&self) -> &RawImage {
        &self.image
    }

    /// HSV version of the image, converted on first use
    pub fn hsv(&self) -> &HsvImage {
        self.hsv.get_or_init(|| HsvImage::from(&self.image))
    }

    pub fn into_image(self) -> RawImage {
        self.image
    }
}

/// Finds the panel in rotated frames and warps it to the canonical rectangle
pub struct Normalizer {
    detector: Box<dyn MarkerDetector>,
    calibration: models::Calibration,
}

impl Normalizer {
    pub fn new(detector: Box<dyn MarkerDetector>, calibration: models::Calibration) -> Self {
        Self {
            detector,
            calibration,
        }
    }

    pub fn calibration(&self) -> &models::Calibration {
        &self.calibration
    }

    /// Pick the outer panel corner of each expected marker
    ///
    /// Returns `None` unless all four expected IDs are present.
    fn select_corners(&self, markers: &[Marker]) -> Option<[Point2D; 4]> {
        let mut corners: [Option<Point2D>; 4] = [None; 4];

        for marker in markers {
            for (slot, (&id, &corner_index)) in corners.iter_mut().zip(
                self.calibration
                    .marker_ids
                    .iter()
                    .zip(self.calibration.corner_indices.iter()),
            ) {
                if marker.id == id {
                    *slot = marker.corners.get(corner_index).copied();
                }
            }
        }

        let found = corners.iter().filter(|c| c.is_some()).count();
        if found != 4 {
            debug!(
                found,
                markers = ?markers.iter().map(|m| m.id).collect::<Vec<_>>(),
                "could not find all panel markers"
            );
            return None;
        }

        Some([corners[0]?, corners[1]?, corners[2]?, corners[3]?])
    }

    /// Normalize an already rotated frame
    ///
    /// Returns `None` when the panel can't be located: this is expected whenever the panel is
    /// out of view, so it is not reported as an error.
    pub fn normalize(&self, rotated: &RawImage) -> Option<NormalizedFrame> {
        let markers = match self.detector.detect(rotated) {
            Ok(markers) => markers,
            Err(error) => {
                warn!(error = %error, "marker detection failed");
                return None;
            }
        };

        let corners = self.select_corners(&markers)?;

        let transform = match Homography::from_correspondences(&corners, &CANONICAL_CORNERS) {
            Some(transform) => transform,
            None => {
                debug!(?corners, "degenerate marker polygon");
                return None;
            }
        };

        warp_perspective(rotated, &transform, CANONICAL_WIDTH, CANONICAL_HEIGHT)
            .map(NormalizedFrame::new)
    }
}

/// One input frame, with its normalized version computed at most once
pub struct PanelFrame<'n> {
    normalizer: &'n Normalizer,
    source: RawImage,
    normalized: OnceCell<Option<NormalizedFrame>>,
}

impl<'n> PanelFrame<'n> {
    /// Wrap a raw camera frame, applying the configured rotation
    pub fn new(normalizer: &'n Normalizer, raw: &RawImage) -> Self {
        Self {
            normalizer,
            source: raw.rotate(normalizer.calibration.rotation),
            normalized: OnceCell::new(),
        }
    }

    /// Rotated source frame
    pub fn source(&self) -> &RawImage {
        &self.source
    }

    /// Normalized frame, if the panel was found
    pub fn normalized(&self) -> Option<&NormalizedFrame> {
        self.normalized
            .get_or_init(|| self.normalizer.normalize(&self.source))
            .as_ref()
    }

    pub fn into_normalized(self) -> Option<NormalizedFrame> {
        self.normalized();
        self.normalized.into_inner().flatten()
    }
}
