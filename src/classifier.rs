//! Feature classification: turns region samples into active/inactive verdicts

use serde_derive::Serialize;

use crate::{
    catalog::{Catalog, Feature},
    normalizer::NormalizedFrame,
    sampler::{self, ColorSample},
};

/// Hue units accepted below the reference hue of a [ThresholdRule::HueWindowed] rule
pub const HUE_WINDOW_BELOW: i16 = 30;
/// Hue units accepted above the reference hue of a [ThresholdRule::HueWindowed] rule
pub const HUE_WINDOW_ABOVE: i16 = 20;

/// Rule deciding whether a region is lit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ThresholdRule {
    /// Active when brighter than the reference value
    Value { value: u8 },
    /// Active when brighter than the reference value and within the hue window around the
    /// reference hue. Used for the display segments, which are dimmer and less saturated than
    /// the LEDs.
    HueWindowed { hue: u8, value: u8 },
}

impl ThresholdRule {
    pub fn evaluate(&self, sample: &ColorSample) -> bool {
        match *self {
            ThresholdRule::Value { value } => sample.value > value,
            ThresholdRule::HueWindowed { hue, value } => {
                let hue = hue as i16;
                let sample_hue = sample.hue as i16;

                sample.value > value
                    && hue - HUE_WINDOW_BELOW <= sample_hue
                    && sample_hue <= hue + HUE_WINDOW_ABOVE
            }
        }
    }
}

/// Sample and verdict for one catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureReading {
    pub feature: Feature,
    /// Mean color of the region, absent without a normalized frame
    pub sample: Option<ColorSample>,
    /// Verdict, absent for reference regions that have no rule
    pub active: Option<bool>,
}

/// Readings of every catalog entry for one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureVector {
    readings: Vec<FeatureReading>,
}

impl FeatureVector {
    /// Sample and classify every catalog entry on the given frame
    ///
    /// Without a frame, or for regions that could not be sampled, every thresholded entry is
    /// inactive.
    pub fn evaluate(catalog: &Catalog, frame: Option<&NormalizedFrame>) -> Self {
        let hsv = frame.map(NormalizedFrame::hsv);

        let readings = catalog
            .iter()
            .map(|entry| {
                let sample = hsv.and_then(|hsv| sampler::sample(hsv, &entry.region));
                let active = entry
                    .rule
                    .map(|rule| sample.map_or(false, |sample| rule.evaluate(&sample)));

                FeatureReading {
                    feature: entry.feature,
                    sample,
                    active,
                }
            })
            .collect();

        Self { readings }
    }

    /// Build a vector where exactly the given features are active
    pub fn from_active(catalog: &Catalog, active: &[Feature]) -> Self {
        let readings = catalog
            .iter()
            .map(|entry| FeatureReading {
                feature: entry.feature,
                sample: None,
                active: entry.rule.map(|_| active.contains(&entry.feature)),
            })
            .collect();

        Self { readings }
    }

    /// `true` if the feature was classified as active
    pub fn is_active(&self, feature: Feature) -> bool {
        self.readings
            .iter()
            .find(|reading| reading.feature == feature)
            .and_then(|reading| reading.active)
            .unwrap_or(false)
    }

    pub fn readings(&self) -> &[FeatureReading] {
        &self.readings
    }

    /// Classified features only, reference regions excluded
    pub fn classified(&self) -> impl Iterator<Item = (Feature, bool)> + '_ {
        self.readings
            .iter()
            .filter_map(|reading| reading.active.map(|active| (reading.feature, active)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG;

    fn sample(hue: u8, value: u8) -> ColorSample {
        ColorSample {
            hue,
            saturation: 0,
            value,
        }
    }

    #[test]
    fn value_threshold_is_strict() {
        let rule = ThresholdRule::Value { value: 130 };

        assert!(!rule.evaluate(&sample(0, 130)));
        assert!(rule.evaluate(&sample(0, 131)));
        assert!(rule.evaluate(&sample(179, 255)));
    }

    #[test]
    fn hue_window_is_asymmetric() {
        let rule = ThresholdRule::HueWindowed { hue: 60, value: 80 };

        assert!(rule.evaluate(&sample(30, 81)));
        assert!(rule.evaluate(&sample(80, 81)));
        assert!(!rule.evaluate(&sample(29, 81)));
        assert!(!rule.evaluate(&sample(81, 81)));
        // Too dark, even in the window
        assert!(!rule.evaluate(&sample(60, 80)));
    }

    #[test]
    fn hue_window_does_not_wrap() {
        let rule = ThresholdRule::HueWindowed { hue: 10, value: 0 };

        assert!(rule.evaluate(&sample(0, 255)));
        assert!(rule.evaluate(&sample(30, 255)));
        assert!(!rule.evaluate(&sample(170, 255)));
    }

    #[test]
    fn no_frame_means_nothing_active() {
        let features = FeatureVector::evaluate(&CATALOG, None);

        assert!(features.classified().all(|(_, active)| !active));
        assert!(features.readings().iter().all(|r| r.sample.is_none()));
    }

    #[test]
    fn reference_regions_are_not_classified() {
        let features = FeatureVector::from_active(&CATALOG, &[Feature::DisplayBackground]);

        assert!(!features.is_active(Feature::DisplayBackground));
        assert!(features
            .classified()
            .all(|(f, _)| f != Feature::DisplayBackground && f != Feature::PanelBackground));
        assert_eq!(features.classified().count(), 24);
    }
}
