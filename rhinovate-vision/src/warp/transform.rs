use image::RgbImage;
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::geometry::{polygon_area, Point};

const MIN_TRIANGLE_AREA: f32 = 1e-3;

/// Planar projective transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    pub fn translation(dx: f32, dy: f32) -> Self {
        Self {
            m: Matrix3::new(1.0, 0.0, dx as f64, 0.0, 1.0, dy as f64, 0.0, 0.0, 1.0),
        }
    }

    /// Exact transform taking each `src[i]` onto `dst[i]`.
    ///
    /// Solves the 8 unknowns of H (with h33 = 1) directly. Returns `None` when
    /// the quads are degenerate, e.g. three collinear corners.
    pub fn from_quads(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        if is_degenerate(src) || is_degenerate(dst) {
            return None;
        }

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (src[i].x as f64, src[i].y as f64);
            let (u, v) = (dst[i].x as f64, dst[i].y as f64);

            let r = 2 * i;
            a[(r, 0)] = x;
            a[(r, 1)] = y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -u * x;
            a[(r, 7)] = -u * y;
            b[r] = u;

            a[(r + 1, 3)] = x;
            a[(r + 1, 4)] = y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -v * x;
            a[(r + 1, 7)] = -v * y;
            b[r + 1] = v;
        }

        let h = a.lu().solve(&b)?;
        if h.iter().any(|v| !v.is_finite()) {
            return None;
        }

        Some(Self {
            m: Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0),
        })
    }

    pub fn inverse(&self) -> Option<Self> {
        self.m.try_inverse().map(|m| Self { m })
    }

    /// Map a point; `None` when it lands on the line at infinity.
    pub fn apply(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let p = self.m * Vector3::new(x as f64, y as f64, 1.0);
        if p[2].abs() < 1e-12 {
            return None;
        }
        Some(((p[0] / p[2]) as f32, (p[1] / p[2]) as f32))
    }
}

/// Any three corners (nearly) collinear.
fn is_degenerate(quad: &[Point; 4]) -> bool {
    (0..4).any(|skip| {
        let tri: Vec<Point> = (0..4).filter(|&i| i != skip).map(|i| quad[i]).collect();
        polygon_area(&tri) < MIN_TRIANGLE_AREA
    })
}

/// Bilinear sample with replicated borders.
pub fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> [f32; 3] {
    let (w, h) = img.dimensions();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    let mut out = [0.0f32; 3];
    for (c, v) in out.iter_mut().enumerate() {
        *v = p00[c] as f32 * w00 + p10[c] as f32 * w10 + p01[c] as f32 * w01 + p11[c] as f32 * w11;
    }
    out
}
