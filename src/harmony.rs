//! Facial harmony score (0-100).

use rhinovate_vision::MeasurementBundle;

use crate::config::BeautyTargets;

const SYMMETRY_WEIGHT: f32 = 0.40;
const NOSE_WEIGHT: f32 = 0.20;
const JAW_WEIGHT: f32 = 0.15;
const CHIN_WEIGHT: f32 = 0.10;
const ENHANCEMENT_WEIGHT: f32 = 0.15;

/// Jaw offset (mm) at which the jaw component reaches zero.
const MAX_EXPECTED_JAW_MM: f32 = 10.0;
/// Chin component used when the projection index is not positive.
const UNKNOWN_CHIN_SCORE: f32 = 0.7;

/// Weighted blend of the measurements and how many enhancements were
/// recommended; fewer enhancements score higher.
pub fn harmony_score(m: &MeasurementBundle, t: &BeautyTargets, enhancements: usize) -> u8 {
    let nose_dev = (m.nose_to_ipd_ratio - t.ideal_nose_to_ipd).abs() / t.ideal_nose_to_ipd;
    let nose = (1.0 - nose_dev * t.nose_severity_gain).max(0.0);

    let jaw = (1.0 - m.jaw_asymmetry_mm.abs() / MAX_EXPECTED_JAW_MM).max(0.0);

    let chin = if m.chin_projection > 0.0 {
        (m.chin_projection / t.chin_projection_threshold).min(1.0)
    } else {
        UNKNOWN_CHIN_SCORE
    };

    let total = m.symmetry_score * SYMMETRY_WEIGHT
        + nose * NOSE_WEIGHT
        + jaw * JAW_WEIGHT
        + chin * CHIN_WEIGHT
        + enhancement_score(enhancements) * ENHANCEMENT_WEIGHT;

    (total * 100.0).round().clamp(0.0, 100.0) as u8
}

fn enhancement_score(count: usize) -> f32 {
    match count {
        0 => 1.0,
        1 => 0.85,
        2 => 0.70,
        n => (0.70 - (n - 2) as f32 * 0.1).max(0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TARGETS;
    use rhinovate_vision::FacialThirds;

    fn ideal() -> MeasurementBundle {
        MeasurementBundle {
            symmetry_score: 1.0,
            nose_to_ipd_ratio: 0.75,
            jaw_asymmetry_mm: 0.0,
            chin_projection: 25.0,
            facial_thirds: FacialThirds {
                upper: 33.0,
                middle: 33.0,
                lower: 34.0,
            },
            ipd_px: 100.0,
            nose_width_px: 75.0,
            face_height_px: 200.0,
            has_depth: false,
        }
    }

    #[test]
    fn ideal_face_scores_full_marks() {
        assert_eq!(harmony_score(&ideal(), &DEFAULT_TARGETS, 0), 100);
    }

    #[test]
    fn more_enhancements_lower_the_score() {
        let m = ideal();
        let scores: Vec<u8> = (0..6).map(|n| harmony_score(&m, &DEFAULT_TARGETS, n)).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{:?}", scores);
        // Floor at half credit for the enhancement component.
        assert_eq!(
            harmony_score(&m, &DEFAULT_TARGETS, 10),
            harmony_score(&m, &DEFAULT_TARGETS, 20)
        );
    }

    #[test]
    fn score_stays_in_range() {
        let m = MeasurementBundle {
            symmetry_score: 0.0,
            nose_to_ipd_ratio: 3.0,
            jaw_asymmetry_mm: -40.0,
            chin_projection: -5.0,
            ..ideal()
        };
        // Only the unknown-chin and floor enhancement components remain: 14.5.
        let score = harmony_score(&m, &DEFAULT_TARGETS, 12);
        assert!((14..=15).contains(&score), "{}", score);
    }
}
