//! Region sampling: mean HSV color of a catalog region

use serde_derive::Serialize;

use crate::{catalog::Region, image::HsvImage};

/// Mean HSV color of a region, 8-bit channels with hue in `0..180`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ColorSample {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

/// Per-channel accumulator
#[derive(Debug, Default)]
struct Accumulator {
    sums: [u64; 3],
    count: u64,
}

impl Accumulator {
    fn add(&mut self, hsv: &[u8]) {
        for (sum, &channel) in self.sums.iter_mut().zip(hsv) {
            *sum += channel as u64;
        }
        self.count += 1;
    }

    /// Rounded mean of each channel
    fn mean(&self) -> Option<ColorSample> {
        if self.count == 0 {
            return None;
        }

        let half = self.count / 2;
        let [h, s, v] = self.sums;
        Some(ColorSample {
            hue: ((h + half) / self.count) as u8,
            saturation: ((s + half) / self.count) as u8,
            value: ((v + half) / self.count) as u8,
        })
    }
}

/// Average each channel of `hsv` over `region`
///
/// Returns `None` if the region is empty or does not fit in the image.
pub fn sample(hsv: &HsvImage, region: &Region) -> Option<ColorSample> {
    if !region.fits(hsv.width(), hsv.height()) {
        return None;
    }

    let end = region.end();
    let mut acc = Accumulator::default();

    for y in region.origin.y..end.y {
        for px in hsv.row(y, region.origin.x, end.x) {
            acc.add(px);
        }
    }

    acc.mean()
}
