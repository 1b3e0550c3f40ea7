//! Synthetic demo face: a flat cartoon drawn around landmarks that break a
//! few of the beauty targets on purpose.

use image::{Rgb, RgbImage};
use rhinovate_vision::geometry::contains;
use rhinovate_vision::{reference_face, LandmarkId, LandmarkSet, Point};

const BACKGROUND: Rgb<u8> = Rgb([0xf0, 0xf0, 0xf0]);
const SKIN: Rgb<u8> = Rgb([0xfd, 0xbc, 0xb4]);
const SHADE: Rgb<u8> = Rgb([0xe8, 0xa0, 0x98]);
const OUTLINE: Rgb<u8> = Rgb([0x20, 0x20, 0x20]);
const SCLERA: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const LIPS: Rgb<u8> = Rgb([0xff, 0x6b, 0x6b]);

/// Reference landmarks with a wide nose, a jaw pushed to image-right and a
/// short, retruded chin.
pub fn demo_landmarks(width: u32, height: u32) -> LandmarkSet {
    let unit = width.min(height) as f32 * 0.8;
    let moves = [
        (LandmarkId::LeftAlar, -0.10, 0.0),
        (LandmarkId::RightAlar, 0.10, 0.0),
        (LandmarkId::LeftJawAngle, 0.01, 0.0),
        (LandmarkId::RightJawAngle, 0.01, 0.0),
        (LandmarkId::Pogonion, 0.0, -0.08),
        (LandmarkId::Menton, 0.0, -0.09),
    ];
    moves
        .iter()
        .fold(reference_face(width, height), |set, &(id, dx, dy)| {
            let p = set.get(id);
            set.with_point(id, Point::new(p.x + dx * unit, p.y + dy * unit))
        })
}

/// Draw a face whose features sit on `lm`.
pub fn draw_face(lm: &LandmarkSet, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    let p = |id| lm.get(id);

    let top = p(LandmarkId::ForeheadTop);
    let bottom = p(LandmarkId::Menton);
    let face_center = top.midpoint(&bottom);
    let rx = (p(LandmarkId::RightJawAngle).x - p(LandmarkId::LeftJawAngle).x) / 2.0 * 1.1;
    let ry = (bottom.y - top.y) / 2.0;
    fill_ellipse(&mut img, face_center, rx + 2.0, ry + 2.0, OUTLINE);
    fill_ellipse(&mut img, face_center, rx, ry, SKIN);

    for (inner, outer, brow) in [
        (LandmarkId::LeftEyeInner, LandmarkId::LeftEyeOuter, LandmarkId::LeftBrowPeak),
        (LandmarkId::RightEyeInner, LandmarkId::RightEyeOuter, LandmarkId::RightBrowPeak),
    ] {
        let center = p(inner).midpoint(&p(outer));
        let half = (p(outer).x - p(inner).x).abs() / 2.0;
        fill_ellipse(&mut img, center, half + 2.0, half * 0.5 + 2.0, OUTLINE);
        fill_ellipse(&mut img, center, half, half * 0.5, SCLERA);
        fill_ellipse(&mut img, center, half * 0.25, half * 0.25, OUTLINE);
        fill_ellipse(&mut img, p(brow), half * 0.9, half * 0.12, OUTLINE);
    }

    let nose = [
        p(LandmarkId::Nasion),
        p(LandmarkId::RightAlar),
        p(LandmarkId::Subnasale),
        p(LandmarkId::LeftAlar),
    ];
    fill_polygon(&mut img, &nose, SHADE);

    let (lm_left, lm_right) = (p(LandmarkId::LeftMouth), p(LandmarkId::RightMouth));
    let mouth_half = (lm_right.x - lm_left.x) / 2.0;
    fill_ellipse(&mut img, lm_left.midpoint(&lm_right), mouth_half, mouth_half * 0.3, LIPS);

    img
}

fn pixel_range(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
    let start = lo.floor().max(0.0) as u32;
    let end = (hi.ceil().max(0.0) as u32).saturating_add(1).min(limit);
    start.min(end)..end
}

fn fill_ellipse(img: &mut RgbImage, center: Point, rx: f32, ry: f32, color: Rgb<u8>) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let (w, h) = img.dimensions();
    for y in pixel_range(center.y - ry, center.y + ry, h) {
        for x in pixel_range(center.x - rx, center.x + rx, w) {
            let dx = (x as f32 - center.x) / rx;
            let dy = (y as f32 - center.y) / ry;
            if dx * dx + dy * dy <= 1.0 {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn fill_polygon(img: &mut RgbImage, polygon: &[Point], color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let min_x = polygon.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let max_x = polygon.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
    let min_y = polygon.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
    let max_y = polygon.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
    for y in pixel_range(min_y, max_y, h) {
        for x in pixel_range(min_x, max_x, w) {
            if contains(polygon, &Point::new(x as f32 + 0.5, y as f32 + 0.5)) {
                img.put_pixel(x, y, color);
            }
        }
    }
}
