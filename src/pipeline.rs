//! Vision-to-state pipeline: one raw frame in, one panel state out

use crate::{
    catalog::{Catalog, CATALOG},
    classifier::FeatureVector,
    decoder::PanelDecoder,
    image::RawImage,
    markers::MarkerDetector,
    models,
    normalizer::{NormalizedFrame, Normalizer, PanelFrame},
    panel::PanelState,
};

/// Outcome of processing one frame
#[derive(Debug)]
pub struct Report {
    pub state: PanelState,
    pub features: FeatureVector,
    /// Perspective-corrected frame, if the panel was found
    pub normalized: Option<NormalizedFrame>,
}

impl Report {
    /// `true` if the panel was located in the frame
    pub fn readable(&self) -> bool {
        self.normalized.is_some()
    }
}

pub struct Pipeline {
    normalizer: Normalizer,
    catalog: &'static Catalog,
    decoder: PanelDecoder,
}

impl Pipeline {
    pub fn new(detector: Box<dyn MarkerDetector>, calibration: models::Calibration) -> Self {
        Self {
            normalizer: Normalizer::new(detector, calibration),
            catalog: &CATALOG,
            decoder: PanelDecoder::new(),
        }
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    pub fn decoder(&self) -> &PanelDecoder {
        &self.decoder
    }

    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    #[instrument(skip(self, raw), fields(width = raw.width(), height = raw.height()))]
    pub fn process(&mut self, raw: &RawImage) -> Report {
        let frame = PanelFrame::new(&self.normalizer, raw);
        let features = FeatureVector::evaluate(self.catalog, frame.normalized());
        let state = self.decoder.decode(&features);

        Report {
            state,
            features,
            normalized: frame.into_normalized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Feature, LSD, MSD},
        image::{Color, Rotation},
        markers::FixedMarkers,
        panel::{Delay, Fan, Mode},
        test_utils::*,
    };

    fn pipeline(markers: Vec<crate::markers::Marker>) -> Pipeline {
        Pipeline::new(
            Box::new(FixedMarkers::new(markers)),
            models::Calibration {
                rotation: Rotation::None,
                ..Default::default()
            },
        )
    }

    #[test]
    fn decodes_painted_digit() {
        let mut image = canonical_frame();
        paint_segments(&mut image, &MSD, "abdeg");

        let report = pipeline(canonical_markers()).process(&image);

        assert!(report.readable());
        assert_eq!(report.state.ms_digit, 2);
        assert_eq!(report.state.ls_digit, -1);
        assert_eq!(report.state.fan, Fan::None);
    }

    #[test]
    fn decodes_painted_panel() {
        let mut image = canonical_frame();
        paint(&mut image, Feature::FanLow, LED_ON);
        paint(&mut image, Feature::ModeCool, LED_ON);
        paint(&mut image, Feature::DelayOff, LED_ON);
        paint(&mut image, Feature::Filter, LED_ON);
        paint_segments(&mut image, &MSD, "abcdfg");
        paint_segments(&mut image, &LSD, "bcfg");

        let report = pipeline(canonical_markers()).process(&image);

        assert_eq!(
            report.state,
            PanelState {
                fan: Fan::Low,
                mode: Mode::Cool,
                delay: Delay::Off,
                ms_digit: 9,
                ls_digit: 4,
                filter_bad: true,
            }
        );
        assert_eq!(report.state.temperature(), Some(94));
    }

    #[test]
    fn off_hue_segments_are_not_lit() {
        // Bright magenta is outside the segment hue window
        let mut image = canonical_frame();
        for feature in MSD.iter() {
            paint(&mut image, *feature, Color::new(255, 0, 255));
        }

        let report = pipeline(canonical_markers()).process(&image);
        assert_eq!(report.state.ms_digit, -1);
        assert!(MSD.iter().all(|f| !report.features.is_active(*f)));
    }

    #[test]
    fn no_markers_decode_to_nothing_but_the_latch() {
        let mut lit = canonical_frame();
        paint(&mut lit, Feature::Filter, LED_ON);
        paint(&mut lit, Feature::FanAuto, LED_ON);

        let mut pipeline = pipeline(canonical_markers());
        assert!(pipeline.process(&lit).state.filter_bad);

        // Same decoder, now blind
        pipeline.normalizer = Normalizer::new(
            Box::new(FixedMarkers::new(vec![])),
            models::Calibration {
                rotation: Rotation::None,
                ..Default::default()
            },
        );
        let report = pipeline.process(&lit);

        assert!(!report.readable());
        assert_eq!(
            report.state,
            PanelState {
                filter_bad: true,
                ..Default::default()
            }
        );

        pipeline.reset();
        assert!(!pipeline.process(&lit).state.filter_bad);
    }

    #[test]
    fn three_markers_leave_every_region_inactive() {
        let mut image = canonical_frame();
        paint(&mut image, Feature::ModeFan, LED_ON);
        paint_segments(&mut image, &LSD, "abcdefg");

        let mut markers = canonical_markers();
        markers.pop();
        let report = pipeline(markers).process(&image);

        assert!(!report.readable());
        assert!(report.features.classified().all(|(_, active)| !active));
        assert_eq!(report.state, PanelState::default());
    }
}
