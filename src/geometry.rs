//! Planar geometry: points, homographies and perspective warping

use std::convert::TryFrom;

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde_derive::{Deserialize, Serialize};

use crate::image::RawImage;

/// Smallest quadrilateral area (in square pixels) accepted for a perspective fit
const MIN_QUAD_AREA: f64 = 1.0;

/// Pixel coordinates in some raster's frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<[f32; 2]> for Point2D {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Signed area of a polygon (shoelace formula)
fn polygon_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64
        })
        .sum();
    twice / 2.0
}

/// 3x3 projective transform
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    h: Matrix3<f64>,
}

impl Homography {
    /// Compute the homography mapping each of `src` to the matching point of `dst`
    ///
    /// Returns `None` if either quadrilateral is degenerate.
    pub fn from_correspondences(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Option<Self> {
        if polygon_area(src).abs() < MIN_QUAD_AREA || polygon_area(dst).abs() < MIN_QUAD_AREA {
            return None;
        }

        // With h33 fixed to 1, four correspondences give an 8x8 linear system
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
            let (sx, sy) = (s.x as f64, s.y as f64);
            let (dx, dy) = (d.x as f64, d.y as f64);

            a[(2 * i, 0)] = sx;
            a[(2 * i, 1)] = sy;
            a[(2 * i, 2)] = 1.0;
            a[(2 * i, 6)] = -sx * dx;
            a[(2 * i, 7)] = -sy * dx;
            b[2 * i] = dx;

            a[(2 * i + 1, 3)] = sx;
            a[(2 * i + 1, 4)] = sy;
            a[(2 * i + 1, 5)] = 1.0;
            a[(2 * i + 1, 6)] = -sx * dy;
            a[(2 * i + 1, 7)] = -sy * dy;
            b[2 * i + 1] = dy;
        }

        let h = a.lu().solve(&b)?;
        if h.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let h = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        if h.determinant().abs() < f64::EPSILON {
            return None;
        }

        Some(Self { h })
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(|h| Self { h })
    }

    /// Map a point, or `None` if it lands on the line at infinity
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let p = self.h * Vector3::new(x, y, 1.0);
        if p[2].abs() < f64::EPSILON {
            return None;
        }

        Some((p[0] / p[2], p[1] / p[2]))
    }
}

/// Bilinear sample at a fractional location, pixels outside the image read as black
fn sample_bilinear(src: &RawImage, x: f64, y: f64) -> [u8; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let mut acc = [0f64; 3];
    for (dx, dy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        if weight == 0.0 {
            continue;
        }

        let px = x0 as i64 + dx;
        let py = y0 as i64 + dy;
        if px < 0 || py < 0 {
            continue;
        }

        if let Some(bgr) = src.bgr_at(px as u32, py as u32) {
            for (a, c) in acc.iter_mut().zip(bgr.iter()) {
                *a += weight * *c as f64;
            }
        }
    }

    [
        acc[0].round().clamp(0.0, 255.0) as u8,
        acc[1].round().clamp(0.0, 255.0) as u8,
        acc[2].round().clamp(0.0, 255.0) as u8,
    ]
}

/// Warp `src` into a `width` x `height` raster using `transform` (source to destination)
///
/// Every destination pixel is mapped back through the inverse transform and sampled bilinearly.
pub fn warp_perspective(
    src: &RawImage,
    transform: &Homography,
    width: u32,
    height: u32,
) -> Option<RawImage> {
    let inverse = transform.inverse()?;
    let mut data = Vec::with_capacity(width as usize * height as usize * RawImage::CHANNELS);

    for y in 0..height {
        for x in 0..width {
            let bgr = match inverse.project(x as f64, y as f64) {
                Some((sx, sy)) if sx.is_finite() && sy.is_finite() => sample_bilinear(src, sx, sy),
                _ => [0, 0, 0],
            };

            data.extend_from_slice(&bgr);
        }
    }

    RawImage::try_from((data, width, height)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Color;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> [Point2D; 4] {
        [
            Point2D::new(x0, y0),
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
        ]
    }

    fn assert_close((x, y): (f64, f64), (ex, ey): (f64, f64)) {
        assert!((x - ex).abs() < 1e-6, "x = {}, expected {}", x, ex);
        assert!((y - ey).abs() < 1e-6, "y = {}, expected {}", y, ey);
    }

    #[test]
    fn identity() {
        let r = rect(0., 0., 530., 1150.);
        let h = Homography::from_correspondences(&r, &r).unwrap();

        assert_close(h.project(12., 34.).unwrap(), (12., 34.));
    }

    #[test]
    fn maps_corners() {
        let src = [
            Point2D::new(10., 20.),
            Point2D::new(300., 35.),
            Point2D::new(280., 600.),
            Point2D::new(25., 580.),
        ];
        let dst = rect(0., 0., 530., 1150.);
        let h = Homography::from_correspondences(&src, &dst).unwrap();

        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(
                h.project(s.x as f64, s.y as f64).unwrap(),
                (d.x as f64, d.y as f64),
            );
        }

        let inv = h.inverse().unwrap();
        assert_close(inv.project(530., 1150.).unwrap(), (280., 600.));
    }

    #[test]
    fn degenerate_quads_are_rejected() {
        let collinear = [
            Point2D::new(0., 0.),
            Point2D::new(1., 1.),
            Point2D::new(2., 2.),
            Point2D::new(3., 3.),
        ];
        let dst = rect(0., 0., 530., 1150.);

        assert!(Homography::from_correspondences(&collinear, &dst).is_none());

        let point = [Point2D::new(5., 5.); 4];
        assert!(Homography::from_correspondences(&point, &dst).is_none());
    }

    #[test]
    fn warp_scales_up() {
        // 2x2 checker scaled to 4x4
        let mut src = RawImage::new(2, 2);
        src.put_color(1, 0, Color::new(255, 255, 255));
        src.put_color(0, 1, Color::new(255, 255, 255));

        let h = Homography::from_correspondences(&rect(0., 0., 1., 1.), &rect(0., 0., 2., 2.))
            .unwrap();
        let out = warp_perspective(&src, &h, 4, 4).unwrap();

        assert_eq!(out.color_at(0, 0), Some(Color::new(0, 0, 0)));
        assert_eq!(out.color_at(2, 0), Some(Color::new(255, 255, 255)));
        assert_eq!(out.color_at(0, 2), Some(Color::new(255, 255, 255)));
        // Halfway between black and white
        let mid = out.color_at(1, 0).unwrap();
        assert!((126..=129).contains(&mid.red), "{:?}", mid);
    }
}
