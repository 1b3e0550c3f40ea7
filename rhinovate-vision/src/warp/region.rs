//! Directive to concrete warp: region mask plus pixel mapping.
//!
//! Every region is derived from the landmarks of the unmodified face. Extents
//! are expressed as fractions of local landmark spans so regions scale with
//! the face, never with the image.

use image::RgbImage;

use crate::directive::{Directive, Direction, Magnitude, Operation};
use crate::error::{Result, VisionError};
use crate::geometry::{polygon_area, Midline, Point};
use crate::landmarks::{LandmarkId, LandmarkSet};
use crate::measure::mm_to_px;

use super::mask::Mask;
use super::transform::{sample_bilinear, Homography};

/// Regions narrower or shorter than this are degenerate.
pub const MIN_REGION_EXTENT_PX: f32 = 2.0;

/// Mirror weight reached at the largest symmetry correction.
pub const MAX_MIRROR_WEIGHT: f32 = 0.5;

/// Mirror weight per unit of symmetry improvement.
pub const MIRROR_GAIN: f32 = 10.0 / 3.0;

/// Brow lifts are capped here whatever the directive asks for.
pub const MAX_BROW_LIFT_MM: f32 = 3.0;

/// How output pixels find their source pixel.
#[derive(Debug, Clone, Copy)]
pub enum Mapping {
    /// Inverse of the forward region transform.
    Inverse(Homography),
    /// Reflection across the facial midline.
    Mirror(Midline),
}

impl Mapping {
    fn source_of(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        match self {
            Mapping::Inverse(h) => h.apply(x, y),
            Mapping::Mirror(midline) => {
                let p = midline.reflect(&Point::new(x, y));
                Some((p.x, p.y))
            }
        }
    }
}

/// A resolved, ready-to-render region warp.
#[derive(Debug, Clone)]
pub struct RegionWarp {
    pub mask: Mask,
    pub mapping: Mapping,
    /// Blend strength applied on top of the mask.
    pub weight: f32,
}

impl RegionWarp {
    /// Blend the remapped pixels into `image` inside the mask.
    ///
    /// Sources are read from a snapshot so the region never samples its own
    /// output.
    pub fn render(&self, image: &mut RgbImage) {
        let source = image.clone();
        for (x, y, m) in self.mask.iter() {
            let Some((sx, sy)) = self.mapping.source_of(x as f32, y as f32) else {
                continue;
            };
            let alpha = (m * self.weight).clamp(0.0, 1.0);
            let sampled = sample_bilinear(&source, sx, sy);
            let pixel = image.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = pixel[c] as f32 * (1.0 - alpha) + sampled[c] * alpha;
                pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Resolve the region and transform for `directive` against `landmarks`.
pub fn resolve(
    landmarks: &LandmarkSet,
    directive: &Directive,
    width: u32,
    height: u32,
) -> Result<RegionWarp> {
    let amount = directive.effective_magnitude();
    let ctx = Ctx {
        lm: landmarks,
        directive,
        width,
        height,
    };

    match directive.operation {
        Operation::WidthNarrow => ctx.nose_width(amount),
        Operation::TipRefine => ctx.nose_tip(amount),
        Operation::BridgeRefine => ctx.nose_bridge(amount),
        Operation::LateralShift => ctx.jaw_shift(amount),
        Operation::ForwardProject => ctx.chin_projection(amount),
        Operation::CheekFill => ctx.cheek_fill(amount),
        Operation::SymmetryBlend => ctx.symmetry_blend(amount),
        Operation::BrowLift => ctx.brow_lift(amount),
        Operation::VerticalStretch => ctx.lower_third_stretch(amount),
        Operation::ProportionBalance => Err(ctx.degenerate("proportion notes have no warp")),
    }
}

struct Ctx<'a> {
    lm: &'a LandmarkSet,
    directive: &'a Directive,
    width: u32,
    height: u32,
}

struct NoseFrame {
    axis_x: f32,
    top: f32,
    bottom: f32,
    width: f32,
}

impl NoseFrame {
    fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

impl<'a> Ctx<'a> {
    fn p(&self, id: LandmarkId) -> Point {
        self.lm.get(id)
    }

    fn degenerate(&self, reason: impl Into<String>) -> VisionError {
        VisionError::WarpRegion {
            directive: self.directive.to_string(),
            reason: reason.into(),
        }
    }

    fn require_extent(&self, what: &str, extent: f32) -> Result<()> {
        if !extent.is_finite() || extent < MIN_REGION_EXTENT_PX {
            return Err(self.degenerate(format!("{} spans {:.2}px", what, extent)));
        }
        Ok(())
    }

    fn nose(&self) -> Result<NoseFrame> {
        let frame = NoseFrame {
            axis_x: self.p(LandmarkId::NoseTip).x,
            top: self.p(LandmarkId::Nasion).y,
            bottom: self.p(LandmarkId::Subnasale).y,
            width: (self.p(LandmarkId::RightAlar).x - self.p(LandmarkId::LeftAlar).x).abs(),
        };
        self.require_extent("nose width", frame.width)?;
        self.require_extent("nose height", frame.height())?;
        Ok(frame)
    }

    /// Quad warp: maps `src` onto `dst` and blends it through `mask`.
    fn quad_warp(&self, src: [Point; 4], dst: [Point; 4], mask: Option<Mask>) -> Result<RegionWarp> {
        let mask = mask.ok_or_else(|| self.degenerate("mask does not cover the image"))?;
        let inverse = Homography::from_quads(&src, &dst)
            .and_then(|h| h.inverse())
            .ok_or_else(|| self.degenerate("transform is not invertible"))?;
        Ok(RegionWarp {
            mask,
            mapping: Mapping::Inverse(inverse),
            weight: 1.0,
        })
    }

    fn ellipse(&self, center: Point, rx: f32, ry: f32, feather: f32) -> Option<Mask> {
        Mask::ellipse(center, rx, ry, feather, self.width, self.height)
    }

    fn polygon(&self, polygon: &[Point], feather: f32) -> Result<Option<Mask>> {
        if polygon_area(polygon) < MIN_REGION_EXTENT_PX * MIN_REGION_EXTENT_PX {
            return Err(self.degenerate("region has no area"));
        }
        Ok(Mask::polygon(polygon, feather, self.width, self.height))
    }

    /// Tapered narrowing of the whole nose toward its vertical axis; the alar
    /// base moves by the full amount, the bridge end by half.
    fn nose_width(&self, amount: f32) -> Result<RegionWarp> {
        let nose = self.nose()?;
        let top = nose.top;
        let bottom = nose.bottom + 0.15 * nose.height();
        let (top_half, base_half) = (0.35 * nose.width, 0.6 * nose.width);
        let (top_new, base_new) = (top_half * (1.0 - 0.5 * amount), base_half * (1.0 - amount));

        let cx = nose.axis_x;
        let src = trapezoid(cx, top, bottom, top_half, base_half);
        let dst = trapezoid(cx, top, bottom, top_new, base_new);
        let mask = self.ellipse(
            Point::new(cx, (top + bottom) / 2.0),
            base_half + 0.1 * nose.width,
            (bottom - top) / 2.0 + 0.1 * nose.height(),
            0.15 * nose.width,
        );
        self.quad_warp(src, dst, mask)
    }

    /// Narrowing nested around the tip, smaller than the nose region.
    fn nose_tip(&self, amount: f32) -> Result<RegionWarp> {
        let nose = self.nose()?;
        let tip = self.p(LandmarkId::NoseTip);
        let half_w = 0.35 * nose.width;
        let half_h = 0.18 * nose.height();
        self.narrow_box(tip, half_w, half_h, amount, 0.08 * nose.width)
    }

    /// Narrowing nested along the upper dorsum.
    fn nose_bridge(&self, amount: f32) -> Result<RegionWarp> {
        let nose = self.nose()?;
        let nasion = self.p(LandmarkId::Nasion);
        let tip = self.p(LandmarkId::NoseTip);
        let center = Point::new(
            nasion.x + 0.35 * (tip.x - nasion.x),
            nose.top + 0.35 * nose.height(),
        );
        let half_w = 0.25 * nose.width;
        let half_h = 0.3 * nose.height();
        self.narrow_box(center, half_w, half_h, amount, 0.06 * nose.width)
    }

    fn narrow_box(
        &self,
        center: Point,
        half_w: f32,
        half_h: f32,
        amount: f32,
        feather: f32,
    ) -> Result<RegionWarp> {
        self.require_extent("refinement width", 2.0 * half_w)?;
        self.require_extent("refinement height", 2.0 * half_h)?;
        let (top, bottom) = (center.y - half_h, center.y + half_h);
        let narrowed = half_w * (1.0 - amount);
        let src = trapezoid(center.x, top, bottom, half_w, half_w);
        let dst = trapezoid(center.x, top, bottom, narrowed, narrowed);
        let mask = self.ellipse(center, half_w, half_h, feather);
        self.quad_warp(src, dst, mask)
    }

    /// Shear the lower face so the jaw moves toward the midline; the jaw-angle
    /// line stays put and the chin moves by the full distance.
    fn jaw_shift(&self, mm: f32) -> Result<RegionWarp> {
        let left = self.p(LandmarkId::LeftJawAngle);
        let right = self.p(LandmarkId::RightJawAngle);
        let menton = self.p(LandmarkId::Menton);
        let top = left.y.min(right.y);
        let bottom = menton.y;
        self.require_extent("jaw width", right.x - left.x)?;
        self.require_extent("jaw height", bottom - top)?;

        let sign = self.directive.direction.map_or(0.0, |d| d.sign());
        let shift = sign * mm_to_px(self.lm, mm);

        let src = [
            Point::new(left.x, top),
            Point::new(right.x, top),
            Point::new(right.x, bottom),
            Point::new(left.x, bottom),
        ];
        let dst = [
            src[0],
            src[1],
            Point::new(right.x + shift, bottom),
            Point::new(left.x + shift, bottom),
        ];
        let outline = [
            left,
            right,
            Point::new((right.x + menton.x) / 2.0, bottom),
            Point::new((left.x + menton.x) / 2.0, bottom),
        ];
        let mask = self.polygon(&outline, 0.1 * (bottom - top))?;
        self.quad_warp(src, dst, mask)
    }

    /// Stretch the chin below the mouth line downward by `amount` of its height.
    fn chin_projection(&self, amount: f32) -> Result<RegionWarp> {
        let left_mouth = self.p(LandmarkId::LeftMouth);
        let right_mouth = self.p(LandmarkId::RightMouth);
        let menton = self.p(LandmarkId::Menton);
        let top = (left_mouth.y + right_mouth.y) / 2.0;
        let bottom = menton.y;
        let half_w = 0.6 * (right_mouth.x - left_mouth.x);
        self.require_extent("chin width", 2.0 * half_w)?;
        self.require_extent("chin height", bottom - top)?;

        let stretch = amount * (bottom - top);
        let src = trapezoid(menton.x, top, bottom, half_w, half_w);
        let dst = [
            src[0],
            src[1],
            Point::new(menton.x + half_w, bottom + stretch),
            Point::new(menton.x - half_w, bottom + stretch),
        ];
        let mask = self.polygon(&dst, 0.12 * (bottom - top))?;
        self.quad_warp(src, dst, mask)
    }

    /// Widen the midface between the cheeks, more at the cheekbones than at
    /// the nose base, to suggest filler volume.
    fn cheek_fill(&self, amount: f32) -> Result<RegionWarp> {
        let left = self.p(LandmarkId::LeftCheek);
        let right = self.p(LandmarkId::RightCheek);
        let top = self.p(LandmarkId::Glabella).y;
        let bottom = self.p(LandmarkId::Subnasale).y;
        let width = right.x - left.x;
        self.require_extent("midface width", width)?;
        self.require_extent("midface height", bottom - top)?;

        let cx = (left.x + right.x) / 2.0;
        let half = width / 2.0;
        let projection = amount * width;
        let src = trapezoid(cx, top, bottom, half, half);
        let dst = trapezoid(cx, top, bottom, half + projection / 3.0, half + projection / 4.0);
        let mask = self.ellipse(
            Point::new(cx, (top + bottom) / 2.0),
            half + projection / 3.0,
            (bottom - top) / 2.0,
            0.08 * width,
        );
        self.quad_warp(src, dst, mask)
    }

    /// Partial blend with the face mirrored across its midline.
    fn symmetry_blend(&self, amount: f32) -> Result<RegionWarp> {
        let midline = self
            .lm
            .midline()
            .ok_or_else(|| self.degenerate("midline has no height"))?;
        let top = self.p(LandmarkId::ForeheadTop).y;
        let bottom = self.p(LandmarkId::Menton).y;
        let ipd = self.lm.interocular_px();
        let half_h = (bottom - top) / 2.0;
        self.require_extent("face height", 2.0 * half_h)?;
        self.require_extent("interocular distance", ipd)?;

        let cy = top + half_h;
        let mask = self
            .ellipse(Point::new(midline.x_at(cy), cy), 0.5 * ipd, half_h, 0.1 * ipd)
            .ok_or_else(|| self.degenerate("mask does not cover the image"))?;
        Ok(RegionWarp {
            mask,
            mapping: Mapping::Mirror(midline),
            weight: (amount * MIRROR_GAIN).min(MAX_MIRROR_WEIGHT),
        })
    }

    /// Lengthen (`Down`) or shorten (`Up`) the face between subnasale and
    /// menton by `amount` of that span; the subnasale line stays put.
    fn lower_third_stretch(&self, amount: f32) -> Result<RegionWarp> {
        let left = self.p(LandmarkId::LeftJawAngle);
        let right = self.p(LandmarkId::RightJawAngle);
        let top = self.p(LandmarkId::Subnasale).y;
        let bottom = self.p(LandmarkId::Menton).y;
        let span = bottom - top;
        self.require_extent("lower face width", right.x - left.x)?;
        self.require_extent("lower face height", span)?;

        let sign = match self.directive.direction {
            Some(d @ (Direction::Up | Direction::Down)) => d.sign(),
            _ => return Err(self.degenerate("stretch needs an up or down direction")),
        };
        let moved = bottom + sign * amount * span;
        self.require_extent("stretched lower face", moved - top)?;

        let src = [
            Point::new(left.x, top),
            Point::new(right.x, top),
            Point::new(right.x, bottom),
            Point::new(left.x, bottom),
        ];
        let dst = [
            src[0],
            src[1],
            Point::new(right.x, moved),
            Point::new(left.x, moved),
        ];
        // Cover both the old and the new chin line.
        let reach = bottom.max(moved);
        let outline = [
            src[0],
            src[1],
            Point::new(right.x, reach),
            Point::new(left.x, reach),
        ];
        let mask = self.polygon(&outline, 0.08 * span)?;
        self.quad_warp(src, dst, mask)
    }

    /// Vertical translation of the brow band, at most [`MAX_BROW_LIFT_MM`].
    fn brow_lift(&self, mm: f32) -> Result<RegionWarp> {
        let mm = match self.directive.magnitude {
            Magnitude::Millimeters(_) => mm.clamp(0.0, MAX_BROW_LIFT_MM),
            Magnitude::Fraction(_) => return Err(self.degenerate("brow lift needs millimetres")),
        };
        let ipd = self.lm.interocular_px();
        let left = self.p(LandmarkId::LeftEyeOuter).x - 0.1 * ipd;
        let right = self.p(LandmarkId::RightEyeOuter).x + 0.1 * ipd;
        let brow_y =
            (self.p(LandmarkId::LeftBrowPeak).y + self.p(LandmarkId::RightBrowPeak).y) / 2.0;
        let half_h = 0.12 * ipd;
        self.require_extent("brow width", right - left)?;
        self.require_extent("brow height", 2.0 * half_h)?;

        let lift = mm_to_px(self.lm, mm);
        let band = [
            Point::new(left, brow_y - half_h),
            Point::new(right, brow_y - half_h),
            Point::new(right, brow_y + half_h),
            Point::new(left, brow_y + half_h),
        ];
        let mask = self
            .polygon(&band, 0.05 * ipd)?
            .ok_or_else(|| self.degenerate("mask does not cover the image"))?;
        Ok(RegionWarp {
            mask,
            mapping: Mapping::Inverse(Homography::translation(0.0, lift)),
            weight: 1.0,
        })
    }
}

/// Quad with horizontal top and bottom edges centred on `cx`.
fn trapezoid(cx: f32, top: f32, bottom: f32, top_half: f32, bottom_half: f32) -> [Point; 4] {
    [
        Point::new(cx - top_half, top),
        Point::new(cx + top_half, top),
        Point::new(cx + bottom_half, bottom),
        Point::new(cx - bottom_half, bottom),
    ]
}
