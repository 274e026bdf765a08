//! Calibration catalog: the fixed regions of the panel in the normalized image
//!
//! All coordinates are in pixels of the perspective-corrected image, where one pixel is about
//! 0.1 mm on the actual panel.

use lazy_static::lazy_static;
use serde_derive::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

use crate::{
    classifier::ThresholdRule,
    normalizer::{CANONICAL_HEIGHT, CANONICAL_WIDTH},
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    EnumIter,
    EnumCount,
    IntoStaticStr,
)]
pub enum Feature {
    FanAuto,
    FanHigh,
    FanMed,
    FanLow,
    ModeCool,
    ModeFan,
    ModeEco,
    DelayOn,
    DelayOff,
    Filter,
    DisplayBackground,
    PanelBackground,
    #[strum(serialize = "MSDA")]
    MsdA,
    #[strum(serialize = "MSDB")]
    MsdB,
    #[strum(serialize = "MSDC")]
    MsdC,
    #[strum(serialize = "MSDD")]
    MsdD,
    #[strum(serialize = "MSDE")]
    MsdE,
    #[strum(serialize = "MSDF")]
    MsdF,
    #[strum(serialize = "MSDG")]
    MsdG,
    #[strum(serialize = "LSDA")]
    LsdA,
    #[strum(serialize = "LSDB")]
    LsdB,
    #[strum(serialize = "LSDC")]
    LsdC,
    #[strum(serialize = "LSDD")]
    LsdD,
    #[strum(serialize = "LSDE")]
    LsdE,
    #[strum(serialize = "LSDF")]
    LsdF,
    #[strum(serialize = "LSDG")]
    LsdG,
}

impl Feature {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Fan speed LEDs, in decoding order
pub const FAN: [Feature; 4] = [
    Feature::FanAuto,
    Feature::FanHigh,
    Feature::FanMed,
    Feature::FanLow,
];

/// Mode LEDs, in decoding order
pub const MODE: [Feature; 3] = [Feature::ModeCool, Feature::ModeFan, Feature::ModeEco];

/// Delay LEDs, in decoding order
pub const DELAY: [Feature; 2] = [Feature::DelayOn, Feature::DelayOff];

/// Segments a to g of the most significant digit
pub const MSD: [Feature; 7] = [
    Feature::MsdA,
    Feature::MsdB,
    Feature::MsdC,
    Feature::MsdD,
    Feature::MsdE,
    Feature::MsdF,
    Feature::MsdG,
];

/// Segments a to g of the least significant digit
pub const LSD: [Feature; 7] = [
    Feature::LsdA,
    Feature::LsdB,
    Feature::LsdC,
    Feature::LsdD,
    Feature::LsdE,
    Feature::LsdF,
    Feature::LsdG,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionSize {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionOrigin {
    pub x: u32,
    pub y: u32,
}

impl std::ops::Add for RegionOrigin {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// Axis-aligned rectangle `[origin, origin + size)` of the normalized image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub origin: RegionOrigin,
    pub size: RegionSize,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            origin: RegionOrigin { x, y },
            size: RegionSize { width, height },
        }
    }

    /// Exclusive bottom-right corner
    pub fn end(&self) -> RegionOrigin {
        RegionOrigin {
            x: self.origin.x + self.size.width,
            y: self.origin.y + self.size.height,
        }
    }

    /// `true` if the region is non-empty and lies within a `width` x `height` raster
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let end = self.end();
        self.size.width > 0 && self.size.height > 0 && end.x <= width && end.y <= height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub feature: Feature,
    pub region: Region,
    /// Reference regions have no rule and are never classified
    pub rule: Option<ThresholdRule>,
}

impl CatalogEntry {
    pub fn name(&self) -> &'static str {
        self.feature.name()
    }
}

const LED_SIZE: RegionSize = RegionSize {
    width: 20,
    height: 20,
};
const VERTICAL_SEGMENT_SIZE: RegionSize = RegionSize {
    width: 10,
    height: 20,
};
const HORIZONTAL_SEGMENT_SIZE: RegionSize = RegionSize {
    width: 20,
    height: 15,
};
const BACKGROUND_SIZE: RegionSize = RegionSize {
    width: 100,
    height: 50,
};

const LED_THRESHOLD: ThresholdRule = ThresholdRule::Value { value: 130 };
const SEGMENT_THRESHOLD: ThresholdRule = ThresholdRule::HueWindowed { hue: 60, value: 80 };

/// Segment positions relative to the display, a to g
const SEGMENT_ORIGINS: [(u32, u32); 7] = [
    (216, 51),
    (241, 70),
    (236, 111),
    (210, 135),
    (195, 111),
    (200, 70),
    (213, 93),
];

const MSD_OFFSET: RegionOrigin = RegionOrigin { x: 0, y: 0 };
const LSD_OFFSET: RegionOrigin = RegionOrigin { x: 75, y: 0 };

/// Immutable table of all panel regions
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Entries in [Feature] declaration order
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    fn led(x: u32, y: u32) -> (Region, Option<ThresholdRule>) {
        (
            Region {
                origin: RegionOrigin { x, y },
                size: LED_SIZE,
            },
            Some(LED_THRESHOLD),
        )
    }

    fn segment(index: usize, offset: RegionOrigin) -> (Region, Option<ThresholdRule>) {
        let (x, y) = SEGMENT_ORIGINS[index];
        // a, d and g are horizontal
        let size = if index == 0 || index == 3 || index == 6 {
            HORIZONTAL_SEGMENT_SIZE
        } else {
            VERTICAL_SEGMENT_SIZE
        };

        (
            Region {
                origin: RegionOrigin { x, y } + offset,
                size,
            },
            Some(SEGMENT_THRESHOLD),
        )
    }

    fn background(x: u32, y: u32) -> (Region, Option<ThresholdRule>) {
        (
            Region {
                origin: RegionOrigin { x, y },
                size: BACKGROUND_SIZE,
            },
            None,
        )
    }

    /// Regions of the supported appliance panel
    pub fn panel() -> Self {
        let entries = Feature::iter()
            .map(|feature| {
                let (region, rule) = match feature {
                    Feature::FanAuto => Self::led(43, 593),
                    Feature::FanHigh => Self::led(43, 665),
                    Feature::FanMed => Self::led(43, 734),
                    Feature::FanLow => Self::led(43, 804),
                    Feature::ModeCool => Self::led(215, 593),
                    Feature::ModeFan => Self::led(215, 665),
                    Feature::ModeEco => Self::led(215, 734),
                    Feature::DelayOn => Self::led(392, 593),
                    Feature::DelayOff => Self::led(392, 665),
                    Feature::Filter => Self::led(251, 1065),
                    Feature::DisplayBackground => Self::background(215, 235),
                    Feature::PanelBackground => Self::background(215, 380),
                    Feature::MsdA => Self::segment(0, MSD_OFFSET),
                    Feature::MsdB => Self::segment(1, MSD_OFFSET),
                    Feature::MsdC => Self::segment(2, MSD_OFFSET),
                    Feature::MsdD => Self::segment(3, MSD_OFFSET),
                    Feature::MsdE => Self::segment(4, MSD_OFFSET),
                    Feature::MsdF => Self::segment(5, MSD_OFFSET),
                    Feature::MsdG => Self::segment(6, MSD_OFFSET),
                    Feature::LsdA => Self::segment(0, LSD_OFFSET),
                    Feature::LsdB => Self::segment(1, LSD_OFFSET),
                    Feature::LsdC => Self::segment(2, LSD_OFFSET),
                    Feature::LsdD => Self::segment(3, LSD_OFFSET),
                    Feature::LsdE => Self::segment(4, LSD_OFFSET),
                    Feature::LsdF => Self::segment(5, LSD_OFFSET),
                    Feature::LsdG => Self::segment(6, LSD_OFFSET),
                };

                CatalogEntry {
                    feature,
                    region,
                    rule,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, feature: Feature) -> &CatalogEntry {
        &self.entries[feature as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

lazy_static! {
    /// Catalog of the supported panel, built once and shared by every frame
    pub static ref CATALOG: Catalog = Catalog::panel();
}
