use palette::{FromColor, Hsv, Srgb};

use super::RawImage;

/// Number of distinct 8-bit hue values: hue is stored in degrees divided by two
pub const HUE_RANGE: u16 = 180;

/// Convert an 8-bit BGR triplet to 8-bit HSV
///
/// Hue is in `0..180` (half-degrees), saturation and value in `0..=255`.
pub fn bgr_to_hsv([b, g, r]: [u8; 3]) -> [u8; 3] {
    let rgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
    let hsv: Hsv = Hsv::from_color(rgb);

    let hue = (hsv.hue.into_positive_degrees() / 2.0).round() as u16 % HUE_RANGE;
    let saturation = (hsv.saturation * 255.0).round().clamp(0.0, 255.0);
    let value = (hsv.value * 255.0).round().clamp(0.0, 255.0);

    [hue as u8, saturation as u8, value as u8]
}

/// HSV copy of a [RawImage]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsvImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl HsvImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// HSV triplet at the given location
    pub fn hsv_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Iterate over the HSV triplets of a row span `[x_start, x_end)`
    ///
    /// # Panics
    ///
    /// Panics if the span is outside of the image.
    pub(crate) fn row(&self, y: u32, x_start: u32, x_end: u32) -> impl Iterator<Item = &[u8]> {
        let start = (y as usize * self.width as usize + x_start as usize) * 3;
        let end = (y as usize * self.width as usize + x_end as usize) * 3;
        self.data[start..end].chunks_exact(3)
    }
}

impl From<&RawImage> for HsvImage {
    fn from(image: &RawImage) -> Self {
        let data = image
            .data()
            .chunks_exact(RawImage::CHANNELS)
            .flat_map(|px| bgr_to_hsv([px[0], px[1], px[2]]))
            .collect();

        Self {
            data,
            width: image.width(),
            height: image.height(),
        }
    }
}
