use serde::{Deserialize, Serialize};

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Vertical facial midline through two stable landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Midline {
    pub top: Point,
    pub bottom: Point,
}

impl Midline {
    /// Returns `None` when the anchors do not span any vertical distance.
    pub fn new(top: Point, bottom: Point) -> Option<Self> {
        if (bottom.y - top.y).abs() < f32::EPSILON || !top.is_finite() || !bottom.is_finite() {
            return None;
        }
        Some(Self { top, bottom })
    }

    /// X coordinate of the (extended) midline at height `y`.
    pub fn x_at(&self, y: f32) -> f32 {
        let t = (y - self.top.y) / (self.bottom.y - self.top.y);
        self.top.x + t * (self.bottom.x - self.top.x)
    }

    /// Signed horizontal offset of `p` from the midline; positive is image-right.
    pub fn horizontal_offset(&self, p: &Point) -> f32 {
        p.x - self.x_at(p.y)
    }

    /// Reflect `p` across the midline.
    pub fn reflect(&self, p: &Point) -> Point {
        let d = self.bottom - self.top;
        let len = (d.x * d.x + d.y * d.y).sqrt();
        let (ux, uy) = (d.x / len, d.y / len);
        let v = *p - self.top;
        let along = v.x * ux + v.y * uy;
        let foot = Point::new(self.top.x + ux * along, self.top.y + uy * along);
        foot * 2.0 - *p
    }
}

/// Area of a polygon using the shoelace formula.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

/// Even-odd point-in-polygon test.
pub fn contains(polygon: &[Point], p: &Point) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
