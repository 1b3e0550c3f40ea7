use image::{ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;

use crate::geometry::{contains, Point};

/// Single-channel float weights, one pixel per mask cell.
pub type WeightImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Feathered region weights in [0, 1], stored only over their bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub x0: u32,
    pub y0: u32,
    /// Pixel `(c, r)` holds the weight of image pixel `(x0 + c, y0 + r)`.
    pub weights: WeightImage,
}

impl Mask {
    /// Filled polygon, softened by a Gaussian of `feather` pixels.
    pub fn polygon(polygon: &[Point], feather: f32, width: u32, height: u32) -> Option<Self> {
        let min_x = polygon.iter().map(|p| p.x).fold(f32::MAX, f32::min);
        let max_x = polygon.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        let min_y = polygon.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        let max_y = polygon.iter().map(|p| p.y).fold(f32::MIN, f32::max);

        Self::rasterize((min_x, min_y, max_x, max_y), feather, width, height, |p| {
            contains(polygon, p)
        })
    }

    /// Filled axis-aligned ellipse, softened by a Gaussian of `feather` pixels.
    pub fn ellipse(
        center: Point,
        rx: f32,
        ry: f32,
        feather: f32,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        if rx <= 0.0 || ry <= 0.0 {
            return None;
        }
        let bounds = (center.x - rx, center.y - ry, center.x + rx, center.y + ry);
        Self::rasterize(bounds, feather, width, height, |p| {
            let dx = (p.x - center.x) / rx;
            let dy = (p.y - center.y) / ry;
            dx * dx + dy * dy <= 1.0
        })
    }

    fn rasterize(
        (min_x, min_y, max_x, max_y): (f32, f32, f32, f32),
        feather: f32,
        width: u32,
        height: u32,
        inside: impl Fn(&Point) -> bool,
    ) -> Option<Self> {
        if width == 0 || height == 0 || ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite())
        {
            return None;
        }

        // The blur replicates borders, so the box edge must stay empty.
        let pad = (3.0 * feather.max(0.0)).ceil();
        let x0 = (min_x - pad).floor().max(0.0);
        let y0 = (min_y - pad).floor().max(0.0);
        let x1 = (max_x + pad).ceil().min((width - 1) as f32);
        let y1 = (max_y + pad).ceil().min((height - 1) as f32);
        if x1 < x0 || y1 < y0 {
            return None;
        }

        let (x0, y0) = (x0 as u32, y0 as u32);
        let cols = x1 as u32 - x0 + 1;
        let rows = y1 as u32 - y0 + 1;

        let hard = WeightImage::from_fn(cols, rows, |c, r| {
            let p = Point::new((x0 + c) as f32, (y0 + r) as f32);
            Luma([if inside(&p) { 1.0 } else { 0.0 }])
        });
        if hard.pixels().all(|w| w[0] == 0.0) {
            return None;
        }

        let weights = if feather > 0.0 {
            gaussian_blur_f32(&hard, feather)
        } else {
            hard
        };

        Some(Self { x0, y0, weights })
    }

    /// Weight at absolute image pixel `(x, y)`, zero outside the box.
    pub fn weight(&self, x: u32, y: u32) -> f32 {
        let (cols, rows) = self.weights.dimensions();
        match (x.checked_sub(self.x0), y.checked_sub(self.y0)) {
            (Some(c), Some(r)) if c < cols && r < rows => self.weights.get_pixel(c, r)[0],
            _ => 0.0,
        }
    }

    /// Total weight, roughly the covered area in pixels.
    pub fn coverage(&self) -> f32 {
        self.weights.pixels().map(|w| w[0]).sum()
    }

    /// Absolute pixel coordinates and weights of every non-zero entry.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        self.weights
            .enumerate_pixels()
            .filter(|(_, _, w)| w[0] > 0.0)
            .map(move |(c, r, w)| (self.x0 + c, self.y0 + r, w[0]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ellipse_mask_is_bounded() {
        let mask = Mask::ellipse(Point::new(50.0, 50.0), 10.0, 5.0, 0.0, 100, 100).unwrap();
        assert_eq!((mask.x0, mask.y0), (40, 45));
        assert!((mask.coverage() - std::f32::consts::PI * 50.0).abs() < 15.0);
        assert!(mask.iter().all(|(x, y, _)| (40..=60).contains(&x) && (45..=55).contains(&y)));
        assert_eq!(mask.weight(50, 50), 1.0);
        assert_eq!(mask.weight(5, 5), 0.0);
    }

    #[test]
    fn test_feather_softens_edges() {
        let hard = Mask::ellipse(Point::new(50.0, 50.0), 10.0, 10.0, 0.0, 100, 100).unwrap();
        let soft = Mask::ellipse(Point::new(50.0, 50.0), 10.0, 10.0, 3.0, 100, 100).unwrap();

        assert!((hard.coverage() - soft.coverage()).abs() < 3.0);
        assert!(soft.weight(50, 50) > 0.99);
        assert!(soft.iter().all(|(_, _, w)| w <= 1.0 + 1e-5));
        assert!(soft.iter().any(|(_, _, w)| w > 0.0 && w < 0.5));
        // Blurred tail reaches past the hard edge.
        assert_eq!(hard.weight(50, 62), 0.0);
        assert!(soft.weight(50, 62) > 0.0);
    }

    #[test]
    fn test_outside_image_is_none() {
        assert!(Mask::ellipse(Point::new(-100.0, -100.0), 5.0, 5.0, 1.0, 50, 50).is_none());
        let square = [
            Point::new(10.0, 10.0),
            Point::new(20.0, 10.0),
            Point::new(20.0, 20.0),
            Point::new(10.0, 20.0),
        ];
        assert!(Mask::polygon(&square, 0.0, 100, 100).is_some());
        let flat = [Point::new(10.0, 10.0), Point::new(20.0, 10.0), Point::new(30.0, 10.0)];
        assert!(Mask::polygon(&flat, 0.0, 100, 100).is_none());
    }
}
