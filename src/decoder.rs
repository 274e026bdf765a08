//! Panel decoding: from classified features to a [PanelState]

use crate::{
    catalog::{Feature, DELAY, FAN, LSD, MODE, MSD},
    classifier::FeatureVector,
    panel::{Delay, Fan, Mode, PanelState},
};

/// Lit segments (a, b, c, d, e, f, g) of each digit
pub const SEVEN_SEGMENT_DIGITS: [[bool; 7]; 10] = [
    [true, true, true, true, true, true, false],
    [false, true, true, false, false, false, false],
    [true, true, false, true, true, false, true],
    [true, true, true, true, false, false, true],
    [false, true, true, false, false, true, true],
    [true, false, true, true, false, true, true],
    [true, false, true, true, true, true, true],
    [true, true, true, false, false, false, false],
    [true, true, true, true, true, true, true],
    [true, true, true, true, false, true, true],
];

/// Digit shown by the given segments, -1 if the pattern is not a digit
pub fn decode_digit(segments: [bool; 7]) -> i8 {
    SEVEN_SEGMENT_DIGITS
        .iter()
        .position(|pattern| *pattern == segments)
        .map_or(-1, |digit| digit as i8)
}

/// 1-based index of the first lit member of a group, 0 if none is lit
pub fn decode_group(lit: &[bool]) -> usize {
    lit.iter().position(|&lit| lit).map_or(0, |index| index + 1)
}

/// Stateful decoder, owning the filter fault latch
#[derive(Debug, Default, Clone)]
pub struct PanelDecoder {
    panel: PanelState,
}

impl PanelDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn segments(features: &FeatureVector, digit: &[Feature; 7]) -> [bool; 7] {
        let mut segments = [false; 7];
        for (segment, &feature) in segments.iter_mut().zip(digit.iter()) {
            *segment = features.is_active(feature);
        }
        segments
    }

    fn group(features: &FeatureVector, group: &[Feature]) -> usize {
        let lit: Vec<_> = group.iter().map(|&f| features.is_active(f)).collect();
        decode_group(&lit)
    }

    /// Decode one frame worth of features
    ///
    /// Everything is derived from `features` alone, except the filter flag which stays set
    /// once it has been seen.
    pub fn decode(&mut self, features: &FeatureVector) -> PanelState {
        let filter_bad = features.is_active(Feature::Filter) || self.panel.filter_bad;
        if filter_bad && !self.panel.filter_bad {
            info!("filter fault latched");
        }

        self.panel = PanelState {
            fan: Fan::from_index(Self::group(features, &FAN)).unwrap_or_default(),
            mode: Mode::from_index(Self::group(features, &MODE)).unwrap_or_default(),
            delay: Delay::from_index(Self::group(features, &DELAY)).unwrap_or_default(),
            ms_digit: decode_digit(Self::segments(features, &MSD)),
            ls_digit: decode_digit(Self::segments(features, &LSD)),
            filter_bad,
        };

        trace!(state = %self.panel, "decoded panel");
        self.panel
    }

    /// Last decoded state
    pub fn state(&self) -> &PanelState {
        &self.panel
    }

    /// Forget everything, including the filter latch
    pub fn reset(&mut self) {
        self.panel = PanelState::default();
    }
}
