//! Landmark geometry to normalized facial measurements.
//!
//! Every length is divided by the interocular distance (outer eye corners) so
//! the bundle does not depend on image resolution. Millimetre-equivalent
//! values assume the interocular distance equals [`REFERENCE_INTEROCULAR_MM`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, VisionError};
use crate::geometry::{Midline, Point};
use crate::landmarks::{LandmarkId, LandmarkSet};

/// Average adult outer-canthal distance used to express lengths in mm.
pub const REFERENCE_INTEROCULAR_MM: f32 = 90.0;

/// Symmetry falls to one half at a mean mirrored deviation of
/// `1 / SYMMETRY_FALLOFF` interocular distances.
pub const SYMMETRY_FALLOFF: f32 = 10.0;

/// Smallest interocular distance treated as a real face.
const MIN_INTEROCULAR_PX: f32 = 1.0;

/// Wider noses than this are a landmark failure, not anatomy.
const MAX_NOSE_TO_IPD: f32 = 3.0;

/// Vertical facial proportions, as percentages summing to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialThirds {
    pub upper: f32,
    pub middle: f32,
    pub lower: f32,
}

impl FacialThirds {
    pub fn total(&self) -> f32 {
        self.upper + self.middle + self.lower
    }
}

/// Measurements derived once per analysed face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBundle {
    /// 1.0 is perfect mirror symmetry.
    pub symmetry_score: f32,
    pub nose_to_ipd_ratio: f32,
    /// Signed jaw offset from the midline in mm; positive is image-right.
    pub jaw_asymmetry_mm: f32,
    pub chin_projection: f32,
    pub facial_thirds: FacialThirds,
    pub ipd_px: f32,
    pub nose_width_px: f32,
    pub face_height_px: f32,
    /// Chin projection came from real depth rather than the 2D proxy.
    pub has_depth: bool,
}

impl MeasurementBundle {
    pub fn px_to_mm(&self, px: f32) -> f32 {
        px / self.ipd_px * REFERENCE_INTEROCULAR_MM
    }

    pub fn face_height_mm(&self) -> f32 {
        self.px_to_mm(self.face_height_px)
    }
}

/// Convert a mm-equivalent length to pixels for the face in `landmarks`.
pub fn mm_to_px(landmarks: &LandmarkSet, mm: f32) -> f32 {
    mm * landmarks.interocular_px() / REFERENCE_INTEROCULAR_MM
}

/// Measure a complete landmark set.
pub fn measure(landmarks: &LandmarkSet) -> Result<MeasurementBundle> {
    let ipd = landmarks.interocular_px();
    if !ipd.is_finite() || ipd <= MIN_INTEROCULAR_PX {
        return Err(VisionError::MeasurementOutOfRange {
            name: "interocular_distance",
            value: ipd,
        });
    }

    let midline = landmarks
        .midline()
        .ok_or(VisionError::MeasurementOutOfRange {
            name: "midline_height",
            value: 0.0,
        })?;

    let symmetry_score = symmetry_score(landmarks, &midline, ipd);

    let nose_width_px =
        (landmarks.get(LandmarkId::RightAlar).x - landmarks.get(LandmarkId::LeftAlar).x).abs();
    let nose_to_ipd_ratio = nose_width_px / ipd;
    if !nose_to_ipd_ratio.is_finite() || nose_to_ipd_ratio > MAX_NOSE_TO_IPD {
        return Err(VisionError::MeasurementOutOfRange {
            name: "nose_to_ipd_ratio",
            value: nose_to_ipd_ratio,
        });
    }

    let jaw_mid = landmarks
        .get(LandmarkId::LeftJawAngle)
        .midpoint(&landmarks.get(LandmarkId::RightJawAngle));
    let jaw_asymmetry_mm = midline.horizontal_offset(&jaw_mid) / ipd * REFERENCE_INTEROCULAR_MM;

    let chin_projection = chin_projection(landmarks, &jaw_mid, ipd);
    let (facial_thirds, face_height_px) = facial_thirds(landmarks)?;

    let bundle = MeasurementBundle {
        symmetry_score,
        nose_to_ipd_ratio,
        jaw_asymmetry_mm,
        chin_projection,
        facial_thirds,
        ipd_px: ipd,
        nose_width_px,
        face_height_px,
        has_depth: landmarks.has_depth(),
    };

    for (name, value) in [
        ("symmetry_score", bundle.symmetry_score),
        ("jaw_asymmetry_mm", bundle.jaw_asymmetry_mm),
        ("chin_projection", bundle.chin_projection),
        ("upper_third", bundle.facial_thirds.upper),
        ("middle_third", bundle.facial_thirds.middle),
        ("lower_third", bundle.facial_thirds.lower),
    ] {
        if !value.is_finite() {
            return Err(VisionError::MeasurementOutOfRange { name, value });
        }
    }

    log::debug!("measurements: {:?}", bundle);
    Ok(bundle)
}

/// Mirror each right-side landmark across the midline and compare it with its
/// left counterpart.
fn symmetry_score(landmarks: &LandmarkSet, midline: &Midline, ipd: f32) -> f32 {
    let deviations: Vec<f32> = LandmarkId::MIRROR_PAIRS
        .iter()
        .map(|&(left, right)| {
            let mirrored = midline.reflect(&landmarks.get(right));
            landmarks.get(left).distance(&mirrored) / ipd
        })
        .collect();
    let mean = deviations.iter().sum::<f32>() / deviations.len() as f32;

    1.0 / (1.0 + SYMMETRY_FALLOFF * mean)
}

/// Forward chin displacement relative to the nasion/jaw plane, in percent of
/// the interocular distance.
///
/// Without depth the chin's vertical reach below the jaw baseline stands in.
fn chin_projection(landmarks: &LandmarkSet, jaw_mid: &Point, ipd: f32) -> f32 {
    let depth = (
        landmarks.depth(LandmarkId::Nasion),
        landmarks.depth(LandmarkId::LeftJawAngle),
        landmarks.depth(LandmarkId::RightJawAngle),
        landmarks.depth(LandmarkId::Pogonion),
    );
    match depth {
        (Some(nasion), Some(left_jaw), Some(right_jaw), Some(pogonion)) => {
            let reference = (nasion + (left_jaw + right_jaw) / 2.0) / 2.0;
            (reference - pogonion) / ipd * 100.0
        }
        _ => (landmarks.get(LandmarkId::Menton).y - jaw_mid.y) / ipd * 100.0,
    }
}

fn facial_thirds(landmarks: &LandmarkSet) -> Result<(FacialThirds, f32)> {
    let hairline = landmarks.get(LandmarkId::ForeheadTop).y;
    let brow = landmarks.get(LandmarkId::Glabella).y;
    let nose_base = landmarks.get(LandmarkId::Subnasale).y;
    let chin = landmarks.get(LandmarkId::Menton).y;

    let spans = [
        ("upper_third", brow - hairline),
        ("middle_third", nose_base - brow),
        ("lower_third", chin - nose_base),
    ];
    for (name, value) in spans {
        if !(value > 0.0) {
            return Err(VisionError::MeasurementOutOfRange { name, value });
        }
    }

    let total = spans.iter().map(|(_, v)| v).sum::<f32>();
    if !total.is_finite() {
        return Err(VisionError::MeasurementOutOfRange {
            name: "face_height",
            value: total,
        });
    }
    let upper = spans[0].1 / total * 100.0;
    let middle = spans[1].1 / total * 100.0;
    // Absorb float drift in the last third so the sum is exactly 100.
    let lower = 100.0 - upper - middle;

    Ok((FacialThirds { upper, middle, lower }, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::reference_face;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_face_is_ideal() {
        let face = reference_face(400, 400);
        let m = measure(&face).unwrap();

        assert_relative_eq!(m.symmetry_score, 1.0, epsilon = 1e-5);
        assert_relative_eq!(m.jaw_asymmetry_mm, 0.0, epsilon = 1e-4);
        assert!(m.nose_to_ipd_ratio < 0.75);
        assert!(m.chin_projection > 20.0);
        assert!(!m.has_depth);
        assert_relative_eq!(m.facial_thirds.total(), 100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_symmetry_decreases_with_deviation() {
        let face = reference_face(400, 400);
        let alar = face.get(LandmarkId::RightAlar);
        let mut previous = measure(&face).unwrap().symmetry_score;

        for shift in [2.0, 5.0, 10.0, 20.0] {
            let moved = face
                .clone()
                .with_point(LandmarkId::RightAlar, Point::new(alar.x + shift, alar.y));
            let score = measure(&moved).unwrap().symmetry_score;
            assert!(score < previous, "score {} not below {}", score, previous);
            assert!(score > 0.0);
            previous = score;
        }
    }

    #[test]
    fn test_jaw_asymmetry_sign_and_scale() {
        let face = reference_face(400, 400);
        let ipd = face.interocular_px();
        let shift = ipd / REFERENCE_INTEROCULAR_MM * 3.0;
        let left = face.get(LandmarkId::LeftJawAngle);
        let right = face.get(LandmarkId::RightJawAngle);
        let moved = face
            .with_point(LandmarkId::LeftJawAngle, Point::new(left.x + shift, left.y))
            .with_point(LandmarkId::RightJawAngle, Point::new(right.x + shift, right.y));

        let m = measure(&moved).unwrap();
        assert_relative_eq!(m.jaw_asymmetry_mm, 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_chin_projection_uses_depth() {
        let face = reference_face(400, 400);
        let ipd = face.interocular_px();
        let with_depth = face.with_depth(|id| match id {
            LandmarkId::Pogonion => -0.1 * ipd,
            _ => 0.0,
        });
        let m = measure(&with_depth).unwrap();
        assert!(m.has_depth);
        assert_relative_eq!(m.chin_projection, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_thirds_follow_landmarks() {
        let face = reference_face(400, 400);
        let top = face.get(LandmarkId::ForeheadTop);
        let lowered = face.with_point(LandmarkId::ForeheadTop, Point::new(top.x, top.y - 40.0));
        let m = measure(&lowered).unwrap();
        assert!(m.facial_thirds.upper > 40.0);
        assert_relative_eq!(m.facial_thirds.total(), 100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inverted_thirds_out_of_range() {
        let face = reference_face(400, 400);
        let sub = face.get(LandmarkId::Subnasale);
        let menton = face.get(LandmarkId::Menton);
        let broken = face.with_point(LandmarkId::Menton, Point::new(menton.x, sub.y - 1.0));
        match measure(&broken) {
            Err(VisionError::MeasurementOutOfRange { name, .. }) => assert_eq!(name, "lower_third"),
            other => panic!("expected MeasurementOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_symmetry_halves_at_falloff_distance() {
        let face = reference_face(400, 400);
        let ipd = face.interocular_px();
        let pairs = LandmarkId::MIRROR_PAIRS.len() as f32;
        // One pair off by `pairs / SYMMETRY_FALLOFF` ipd gives that mean.
        let shift = ipd * pairs / SYMMETRY_FALLOFF;
        let cheek = face.get(LandmarkId::RightCheek);
        let moved = face.with_point(LandmarkId::RightCheek, Point::new(cheek.x, cheek.y + shift));
        assert_relative_eq!(measure(&moved).unwrap().symmetry_score, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_overflowing_face_height_out_of_range() {
        let face = reference_face(400, 400).with_depth(|_| 0.0);
        let top = face.get(LandmarkId::ForeheadTop);
        let menton = face.get(LandmarkId::Menton);
        let huge = face
            .with_point(LandmarkId::ForeheadTop, Point::new(top.x, -3.0e38))
            .with_point(LandmarkId::Menton, Point::new(menton.x, 3.0e38));
        match measure(&huge) {
            Err(VisionError::MeasurementOutOfRange { name, value }) => {
                assert_eq!(name, "face_height");
                assert!(value.is_infinite());
            }
            other => panic!("expected MeasurementOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_collapsed_eyes_out_of_range() {
        let face = reference_face(400, 400);
        let left = face.get(LandmarkId::LeftEyeOuter);
        let broken = face.with_point(LandmarkId::RightEyeOuter, left);
        assert!(matches!(
            measure(&broken),
            Err(VisionError::MeasurementOutOfRange {
                name: "interocular_distance",
                ..
            })
        ));
    }
}
