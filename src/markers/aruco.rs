use opencv::{
    core::{Mat, Point2f, Vector},
    objdetect::{self, DetectorParameters, PredefinedDictionaryType, RefineParameters},
    prelude::*,
};

use super::{DetectError, Marker, MarkerDetector};
use crate::{geometry::Point2D, image::RawImage, models};

/// ArUco marker detector backed by OpenCV
pub struct ArucoDetector {
    inner: objdetect::ArucoDetector,
}

impl ArucoDetector {
    pub fn new(config: &models::Aruco) -> Result<Self, DetectError> {
        let dictionary = objdetect::get_predefined_dictionary(match config.dictionary {
            models::ArucoDictionary::Dict4x4_50 => PredefinedDictionaryType::DICT_4X4_50,
            models::ArucoDictionary::Dict4x4_100 => PredefinedDictionaryType::DICT_4X4_100,
            models::ArucoDictionary::Dict4x4_250 => PredefinedDictionaryType::DICT_4X4_250,
            models::ArucoDictionary::Dict4x4_1000 => PredefinedDictionaryType::DICT_4X4_1000,
        })?;

        let inner = objdetect::ArucoDetector::new(
            &dictionary,
            &DetectorParameters::default()?,
            RefineParameters::new(10., 3., true)?,
        )?;

        Ok(Self { inner })
    }
}

impl MarkerDetector for ArucoDetector {
    fn detect(&self, image: &RawImage) -> Result<Vec<Marker>, DetectError> {
        // Wrap the BGR data as a rows x cols, 3 channel matrix
        let flat = Mat::from_slice(image.data())?;
        let mat = flat.reshape(3, image.height() as i32)?.try_clone()?;

        let mut corners = Vector::<Vector<Point2f>>::new();
        let mut ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();

        self.inner
            .detect_markers(&mat, &mut corners, &mut ids, &mut rejected)?;

        let mut markers = Vec::with_capacity(ids.len());
        for (id, polygon) in ids.iter().zip(corners.iter()) {
            if polygon.len() != 4 {
                continue;
            }

            let mut points = [Point2D::default(); 4];
            for (point, corner) in points.iter_mut().zip(polygon.iter()) {
                *point = Point2D::new(corner.x, corner.y);
            }

            markers.push(Marker {
                id,
                corners: points,
            });
        }

        trace!(count = markers.len(), rejected = rejected.len(), "detected markers");
        Ok(markers)
    }
}
