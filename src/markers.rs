//! Fiducial marker detection
//!
//! Detection itself is an opaque capability: a [MarkerDetector] returns zero or more markers,
//! each with an integer ID and its four corners in image coordinates.

use thiserror::Error;

use crate::{geometry::Point2D, image::RawImage, models};

mod fixed;
pub use fixed::FixedMarkers;

#[cfg(feature = "opencv")]
mod aruco;
#[cfg(feature = "opencv")]
pub use aruco::ArucoDetector;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("detector not supported: {0}")]
    NotSupported(&'static str),
    #[cfg(feature = "opencv")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// A detected fiducial marker
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: i32,
    /// Corners in the detector's clockwise order
    pub corners: [Point2D; 4],
}

pub trait MarkerDetector: Send {
    /// Detect all markers visible in the given image
    fn detect(&self, image: &RawImage) -> Result<Vec<Marker>, DetectError>;
}

/// Build the marker detector described by the configuration
pub fn from_config(config: &models::Detector) -> Result<Box<dyn MarkerDetector>, DetectError> {
    let detector: Box<dyn MarkerDetector>;
    match config {
        models::Detector::Fixed(fixed) => {
            detector = Box::new(FixedMarkers::from(fixed));
        }
        #[cfg(feature = "opencv")]
        models::Detector::Aruco(aruco) => {
            detector = Box::new(ArucoDetector::new(aruco)?);
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(DetectError::NotSupported(other.into()));
        }
    }

    Ok(detector)
}
