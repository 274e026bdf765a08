use std::{convert::TryFrom, path::Path};

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use super::Color;

#[derive(Debug, Error)]
pub enum RawImageError {
    #[error("invalid data ({data} bytes) for the given dimensions ({width} x {height} x {channels} = {expected})")]
    InvalidData {
        data: usize,
        width: u32,
        height: u32,
        channels: usize,
        expected: usize,
    },
    #[error("invalid dimensions ({width} x {height})")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("error decoding image: {0}")]
    Decode(#[from] ::image::ImageError),
}

/// Quarter-turn applied to incoming frames before marker detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "cw90")]
    Clockwise90,
    #[serde(rename = "180")]
    Half,
    #[serde(rename = "ccw90")]
    CounterClockwise90,
}

impl Default for Rotation {
    fn default() -> Self {
        // The camera is mounted sideways
        Self::Clockwise90
    }
}

/// 8-bit BGR raster, row-major, 3 interleaved channels
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("RawImage");
        f.field("width", &self.width);
        f.field("height", &self.height);

        if self.data.len() > 32 {
            f.field("data", &format!("[{} bytes]", self.data.len()));
        } else {
            f.field("data", &self.data);
        }

        f.finish()
    }
}

impl RawImage {
    pub const CHANNELS: usize = 3;

    /// Create a black image
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::new(0, 0, 0))
    }

    /// Create an image where every pixel has the given color
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * Self::CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&[color.blue, color.green, color.red]);
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// Decode an image file into a BGR raster
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RawImageError> {
        let rgb = ::image::open(path)?.into_rgb8();
        Ok(Self::from(&rgb))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGR bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::CHANNELS
    }

    /// Raw BGR triplet at the given location
    pub fn bgr_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let idx = self.offset(x, y);
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.bgr_at(x, y).map(|[b, g, r]| Color::new(r, g, b))
    }

    /// Set a pixel, ignoring out of bounds coordinates
    pub fn put_color(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            let idx = self.offset(x, y);
            self.data[idx..idx + 3].copy_from_slice(&[color.blue, color.green, color.red]);
        }
    }

    /// Fill the rectangle `[x, x + width) x [y, y + height)`, clipped to the image
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);

        for j in y..y_end {
            for i in x..x_end {
                self.put_color(i, j, color);
            }
        }
    }

    /// Return a rotated copy of this image
    pub fn rotate(&self, rotation: Rotation) -> Self {
        let (w, h) = (self.width, self.height);
        let (width, height) = match rotation {
            Rotation::None | Rotation::Half => (w, h),
            Rotation::Clockwise90 | Rotation::CounterClockwise90 => (h, w),
        };

        if rotation == Rotation::None {
            return self.clone();
        }

        let mut data = vec![0u8; self.data.len()];
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = match rotation {
                    Rotation::None => (x, y),
                    Rotation::Clockwise90 => (y, h - 1 - x),
                    Rotation::Half => (w - 1 - x, h - 1 - y),
                    Rotation::CounterClockwise90 => (w - 1 - y, x),
                };

                let src = self.offset(sx, sy);
                let dst = (y as usize * width as usize + x as usize) * Self::CHANNELS;
                data[dst..dst + 3].copy_from_slice(&self.data[src..src + 3]);
            }
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// Convert to an `image` RGB buffer, for encoding
    pub fn to_rgb_image(&self) -> ::image::RgbImage {
        ::image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let idx = self.offset(x, y);
            ::image::Rgb([self.data[idx + 2], self.data[idx + 1], self.data[idx]])
        })
    }
}

impl TryFrom<(Vec<u8>, u32, u32)> for RawImage {
    type Error = RawImageError;

    /// Build from raw BGR data
    fn try_from((data, width, height): (Vec<u8>, u32, u32)) -> Result<Self, Self::Error> {
        if width == 0 || height == 0 {
            return Err(RawImageError::InvalidDimensions { width, height });
        }

        let channels = Self::CHANNELS;
        let expected = width as usize * height as usize * channels;

        if data.len() != expected {
            return Err(RawImageError::InvalidData {
                data: data.len(),
                width,
                height,
                channels,
                expected,
            });
        }

        Ok(Self {
            data,
            width,
            height,
        })
    }
}

impl From<&::image::RgbImage> for RawImage {
    fn from(rgb: &::image::RgbImage) -> Self {
        let mut data = Vec::with_capacity(rgb.as_raw().len());
        for px in rgb.pixels() {
            let [r, g, b] = px.0;
            data.extend_from_slice(&[b, g, r]);
        }

        Self {
            data,
            width: rgb.width(),
            height: rgb.height(),
        }
    }
}
