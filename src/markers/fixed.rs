use super::{DetectError, Marker, MarkerDetector};
use crate::{geometry::Point2D, image::RawImage, models};

/// Detector that always reports the same markers, whatever the image
#[derive(Debug, Default, Clone)]
pub struct FixedMarkers {
    markers: Vec<Marker>,
}

impl FixedMarkers {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self { markers }
    }
}

impl From<&models::Fixed> for FixedMarkers {
    fn from(config: &models::Fixed) -> Self {
        Self::new(
            config
                .markers
                .iter()
                .map(|marker| Marker {
                    id: marker.id,
                    corners: [
                        Point2D::from(marker.corners[0]),
                        Point2D::from(marker.corners[1]),
                        Point2D::from(marker.corners[2]),
                        Point2D::from(marker.corners[3]),
                    ],
                })
                .collect(),
        )
    }
}

impl MarkerDetector for FixedMarkers {
    fn detect(&self, _image: &RawImage) -> Result<Vec<Marker>, DetectError> {
        Ok(self.markers.clone())
    }
}
