//! Beauty rules engine.
//!
//! Compares a [`MeasurementBundle`] against [`BeautyTargets`] and emits the
//! ordered list of bounded correction directives. Rules run in a fixed order
//! (symmetry, nose, jaw, chin, facial thirds), which is also the order the
//! warp engine renders them in. Every magnitude is clamped to its target cap.

use rhinovate_vision::{
    Directive, Direction, Magnitude, MeasurementBundle, NonVisualReason, Operation, Region,
    Rendering, Rule,
};

use crate::config::BeautyTargets;

/// Readable output when no rule is violated.
pub const WELL_BALANCED: [&str; 2] = [
    "Your facial features are already well-balanced!",
    "No enhancements recommended - your facial harmony is optimal",
];

/// Evaluate every rule against `m`.
///
/// Pure and deterministic: identical inputs give an identical, order-stable
/// directive list.
pub fn plan(m: &MeasurementBundle, t: &BeautyTargets) -> Vec<Directive> {
    let mut directives = Vec::new();
    symmetry(m, t, &mut directives);
    nose(m, t, &mut directives);
    jaw(m, t, &mut directives);
    chin(m, t, &mut directives);
    facial_thirds(m, t, &mut directives);
    directives
}

/// Distinct rules that produced at least one directive, in evaluation order.
pub fn violated_rules(directives: &[Directive]) -> Vec<Rule> {
    let mut rules: Vec<Rule> = directives.iter().map(|d| d.rule).collect();
    rules.sort();
    rules.dedup();
    rules
}

fn visual(
    rule: Rule,
    region: Region,
    operation: Operation,
    magnitude: Magnitude,
    disclosure: String,
    label: &str,
) -> Directive {
    Directive {
        rule,
        region,
        operation,
        magnitude,
        direction: None,
        rendering: Rendering::Visual,
        disclosure,
        label: label.to_string(),
    }
}

fn symmetry(m: &MeasurementBundle, t: &BeautyTargets, out: &mut Vec<Directive>) {
    if m.symmetry_score >= t.target_symmetry {
        return;
    }
    let delta = (t.target_symmetry - m.symmetry_score).min(t.max_symmetry_delta);
    let magnitude = Magnitude::Fraction(delta);
    out.push(visual(
        Rule::Symmetry,
        Region::Face,
        Operation::SymmetryBlend,
        magnitude,
        format!(
            "Facial Symmetry Correction: Balance left/right facial features \
             ({} AI-enhanced symmetry adjustment, score {:.2} vs target {:.2}) \
             - improves overall facial harmony",
            magnitude, m.symmetry_score, t.target_symmetry
        ),
        "Facial symmetry correction (AI)",
    ));
}

fn nose(m: &MeasurementBundle, t: &BeautyTargets, out: &mut Vec<Directive>) {
    let ratio = m.nose_to_ipd_ratio;
    if ratio <= t.ideal_nose_to_ipd {
        return;
    }
    let excess = (ratio / t.ideal_nose_to_ipd - 1.0) * t.nose_severity_gain;
    let reduction = excess.min(t.max_nose_reduction);
    let magnitude = Magnitude::Fraction(reduction);
    out.push(visual(
        Rule::Nose,
        Region::Nose,
        Operation::WidthNarrow,
        magnitude,
        format!(
            "Nasal Width Reduction: {} overall nasal width reduction \
             (nose is {:.2}x the interocular distance, ideal at most {:.2})",
            magnitude, ratio, t.ideal_nose_to_ipd
        ),
        "Nasal width reduction (AI)",
    ));

    if reduction > t.tip_refinement_threshold {
        let magnitude = Magnitude::Fraction(t.tip_refinement);
        out.push(visual(
            Rule::Nose,
            Region::NoseTip,
            Operation::TipRefine,
            magnitude,
            format!(
                "Nasal Tip Refinement: {} tip narrowing and definition \
                 - accompanies a width reduction above {}",
                magnitude,
                Magnitude::Fraction(t.tip_refinement_threshold)
            ),
            "Tip refinement & definition (AI)",
        ));
    }
    if reduction > t.bridge_refinement_threshold {
        let magnitude = Magnitude::Fraction(t.bridge_refinement);
        out.push(visual(
            Rule::Nose,
            Region::NoseBridge,
            Operation::BridgeRefine,
            magnitude,
            format!(
                "Nasal Bridge Refinement: {} bridge narrowing \
                 - accompanies a width reduction above {}",
                magnitude,
                Magnitude::Fraction(t.bridge_refinement_threshold)
            ),
            "Bridge narrowing & refinement (AI)",
        ));
    }
}

fn jaw(m: &MeasurementBundle, t: &BeautyTargets, out: &mut Vec<Directive>) {
    let asymmetry = m.jaw_asymmetry_mm;
    if asymmetry.abs() <= t.jaw_tolerance_mm {
        return;
    }
    let magnitude = Magnitude::Millimeters(asymmetry.abs().min(t.max_jaw_correction_mm));
    // Shift back toward the midline.
    let direction = if asymmetry > 0.0 {
        Direction::Left
    } else {
        Direction::Right
    };
    out.push(Directive {
        direction: Some(direction),
        ..visual(
            Rule::Jaw,
            Region::Jaw,
            Operation::LateralShift,
            magnitude,
            format!(
                "Jawline Contouring: Correct jaw asymmetry ({} lateral adjustment \
                 of a {:.1}mm offset) - improves facial symmetry and balance",
                magnitude,
                asymmetry.abs()
            ),
            "Jawline contouring (AI)",
        )
    });
}

fn chin(m: &MeasurementBundle, t: &BeautyTargets, out: &mut Vec<Directive>) {
    let threshold = t.chin_projection_threshold;
    if threshold <= 0.0 || m.chin_projection >= threshold {
        return;
    }
    let severity = (threshold - m.chin_projection) / threshold;
    let magnitude = Magnitude::Fraction(severity.min(t.max_chin_projection));
    out.push(visual(
        Rule::Chin,
        Region::Chin,
        Operation::ForwardProject,
        magnitude,
        format!(
            "Chin Enhancement: Increase chin projection ({} forward projection, \
             index {:.1} below {:.0}) - improves profile definition",
            magnitude, m.chin_projection, threshold
        ),
        "Chin augmentation (filler simulation)",
    ));
}

fn facial_thirds(m: &MeasurementBundle, t: &BeautyTargets, out: &mut Vec<Directive>) {
    let thirds = m.facial_thirds;
    let rows = [
        (Region::UpperThird, thirds.upper / 100.0, t.ideal_upper_third),
        (Region::MiddleThird, thirds.middle / 100.0, t.ideal_middle_third),
        (Region::LowerThird, thirds.lower / 100.0, t.ideal_lower_third),
    ];

    for (region, current, ideal) in rows {
        let deviation = current - ideal;
        if deviation.abs() <= t.thirds_tolerance {
            continue;
        }
        let change = format!("{:.1}% -> {:.1}%", current * 100.0, ideal * 100.0);
        let directive = match region {
            Region::UpperThird if deviation.abs() <= t.brow_lift_band => {
                let mm = (deviation.abs() * m.face_height_mm()).min(t.max_brow_lift_mm);
                let magnitude = Magnitude::Millimeters(mm);
                visual(
                    Rule::FacialThirds,
                    region,
                    Operation::BrowLift,
                    magnitude,
                    format!(
                        "Upper Third Optimization: Minimal Botox brow lift effect \
                         ({}, {} lift) - very subtle, Botox can only lift brows 1-3mm",
                        change, magnitude
                    ),
                    "Brow lift (Botox simulation)",
                )
            }
            Region::UpperThird => placeholder(
                region,
                NonVisualReason::SurgeryOnly,
                format!(
                    "Upper Third Optimization: Requires surgical brow lift or forehead \
                     reduction ({}) - beyond Botox capability, not rendered",
                    change
                ),
                "Brow lift or forehead reduction (surgical consult)",
            ),
            Region::MiddleThird if deviation < 0.0 => {
                let magnitude = Magnitude::Fraction(deviation.abs().min(t.max_cheek_fill));
                visual(
                    Rule::FacialThirds,
                    region,
                    Operation::CheekFill,
                    magnitude,
                    format!(
                        "Middle Third Enhancement: Cheek/midface augmentation with dermal \
                         fillers ({}, {} forward projection) - adds volume to the midface",
                        change, magnitude
                    ),
                    "Midface filler (simulation)",
                )
            }
            Region::MiddleThird => placeholder(
                region,
                NonVisualReason::SurgeryOnly,
                format!(
                    "Middle Third Optimization: Midface shortening ({}) \
                     - requires surgery, not rendered",
                    change
                ),
                "Midface reduction (surgical consult)",
            ),
            _ => {
                let stretch =
                    (deviation.abs() * t.lower_third_stretch_gain).min(t.max_lower_third_stretch);
                let magnitude = Magnitude::Fraction(stretch);
                let (direction, verb, label) = if deviation < 0.0 {
                    (Direction::Down, "lengthening", "Lower third lengthening (filler simulation)")
                } else {
                    (Direction::Up, "shortening", "Lower third balancing (simulation)")
                };
                Directive {
                    direction: Some(direction),
                    ..visual(
                        Rule::FacialThirds,
                        region,
                        Operation::VerticalStretch,
                        magnitude,
                        format!(
                            "Lower Third Optimization: Lip-to-chin {} ({}, {} vertical change) \
                             - balances the lower face against the upper two thirds",
                            verb, change, magnitude
                        ),
                        label,
                    )
                }
            }
        };
        out.push(directive);
    }
}

fn placeholder(region: Region, reason: NonVisualReason, disclosure: String, label: &str) -> Directive {
    Directive {
        rule: Rule::FacialThirds,
        region,
        operation: Operation::ProportionBalance,
        magnitude: Magnitude::Fraction(0.0),
        direction: None,
        rendering: Rendering::NonVisual(reason),
        disclosure,
        label: label.to_string(),
    }
}

/// Human-readable recommendations: nose directives are merged into one
/// rhinoplasty entry listed first, everything else keeps its disclosure.
pub fn recommendations(directives: &[Directive]) -> Vec<String> {
    let mut out = Vec::new();
    let mut nose_items = Vec::new();

    for d in directives {
        if d.rule == Rule::Nose {
            nose_items.push(match d.operation {
                Operation::WidthNarrow => format!("{} overall nasal width reduction", d.magnitude),
                Operation::TipRefine => "nasal tip refinement and definition".to_string(),
                _ => "nasal bridge narrowing".to_string(),
            });
        } else {
            out.push(d.disclosure.clone());
        }
    }

    if !nose_items.is_empty() {
        out.insert(
            0,
            format!(
                "Comprehensive Rhinoplasty: {} - creates more refined, elegant nasal \
                 proportions for enhanced facial harmony",
                nose_items.join(", ")
            ),
        );
    }

    if out.is_empty() {
        out.extend(WELL_BALANCED.iter().map(|s| s.to_string()));
    }
    out
}

/// Procedure labels, one per directive, with the umbrella rhinoplasty label
/// ahead of the nose width reduction.
pub fn procedure_labels(directives: &[Directive]) -> Vec<String> {
    let mut labels = Vec::with_capacity(directives.len() + 1);
    for d in directives {
        if d.operation == Operation::WidthNarrow {
            labels.push("Comprehensive rhinoplasty (AI)".to_string());
        }
        labels.push(d.label.clone());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DEFAULT_TARGETS, MAX_CHIN_PROJECTION, MAX_JAW_CORRECTION_MM, MAX_LOWER_THIRD_STRETCH,
    };
    use approx::assert_relative_eq;
    use rhinovate_vision::FacialThirds;

    /// A face that violates nothing.
    fn balanced() -> MeasurementBundle {
        MeasurementBundle {
            symmetry_score: 0.95,
            nose_to_ipd_ratio: 0.70,
            jaw_asymmetry_mm: 0.0,
            chin_projection: 30.0,
            facial_thirds: FacialThirds {
                upper: 33.0,
                middle: 33.0,
                lower: 34.0,
            },
            ipd_px: 90.0,
            nose_width_px: 63.0,
            face_height_px: 180.0,
            has_depth: false,
        }
    }

    fn only(m: &MeasurementBundle, rule: Rule) -> Vec<Directive> {
        plan(m, &DEFAULT_TARGETS)
            .into_iter()
            .filter(|d| d.rule == rule)
            .collect()
    }

    #[test]
    fn balanced_face_needs_nothing() {
        let directives = plan(&balanced(), &DEFAULT_TARGETS);
        assert!(directives.is_empty());
        assert_eq!(recommendations(&directives), WELL_BALANCED.map(String::from).to_vec());
        assert!(procedure_labels(&directives).is_empty());
    }

    #[test]
    fn symmetry_scenarios() {
        let m = MeasurementBundle {
            symmetry_score: 0.95,
            ..balanced()
        };
        assert!(only(&m, Rule::Symmetry).is_empty());

        let m = MeasurementBundle {
            symmetry_score: 0.80,
            ..balanced()
        };
        let d = only(&m, Rule::Symmetry);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].operation, Operation::SymmetryBlend);
        assert!(d[0].magnitude.value() <= 0.15);
        assert_relative_eq!(d[0].magnitude.value(), 0.10, epsilon = 1e-5);

        let m = MeasurementBundle {
            symmetry_score: 0.2,
            ..balanced()
        };
        assert_relative_eq!(only(&m, Rule::Symmetry)[0].magnitude.value(), 0.15);
    }

    #[test]
    fn wide_nose_gets_full_rhinoplasty() {
        let m = MeasurementBundle {
            nose_to_ipd_ratio: 0.90,
            ..balanced()
        };
        let d = only(&m, Rule::Nose);
        let ops: Vec<Operation> = d.iter().map(|d| d.operation).collect();
        assert_eq!(
            ops,
            vec![Operation::WidthNarrow, Operation::TipRefine, Operation::BridgeRefine]
        );
        assert_eq!(d[0].magnitude, Magnitude::Fraction(0.30));
        assert_eq!(d[1].magnitude, Magnitude::Fraction(0.15));
        assert_eq!(d[2].magnitude, Magnitude::Fraction(0.10));

        let recs = recommendations(&d);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].starts_with("Comprehensive Rhinoplasty: 30% overall nasal width reduction"));
        assert_eq!(procedure_labels(&d)[0], "Comprehensive rhinoplasty (AI)");
        assert_eq!(procedure_labels(&d).len(), 4);
    }

    #[test]
    fn slightly_wide_nose_skips_refinements() {
        // Relative excess 0.04, doubled to an 8% reduction.
        let m = MeasurementBundle {
            nose_to_ipd_ratio: 0.78,
            ..balanced()
        };
        let d = only(&m, Rule::Nose);
        assert_eq!(d.len(), 1);
        assert_relative_eq!(d[0].magnitude.value(), 0.08, epsilon = 1e-5);

        // 13%: bridge but not tip.
        let m = MeasurementBundle {
            nose_to_ipd_ratio: 0.75 * 1.065,
            ..balanced()
        };
        let ops: Vec<Operation> = only(&m, Rule::Nose).iter().map(|d| d.operation).collect();
        assert_eq!(ops, vec![Operation::WidthNarrow, Operation::BridgeRefine]);
    }

    #[test]
    fn jaw_scenarios() {
        let m = MeasurementBundle {
            jaw_asymmetry_mm: 0.5,
            ..balanced()
        };
        assert!(only(&m, Rule::Jaw).is_empty());

        let m = MeasurementBundle {
            jaw_asymmetry_mm: 3.0,
            ..balanced()
        };
        let d = only(&m, Rule::Jaw);
        assert_eq!(d[0].magnitude, Magnitude::Millimeters(2.0));
        assert_eq!(d[0].direction, Some(Direction::Left));

        let m = MeasurementBundle {
            jaw_asymmetry_mm: -1.5,
            ..balanced()
        };
        let d = only(&m, Rule::Jaw);
        assert_eq!(d[0].magnitude, Magnitude::Millimeters(1.5));
        assert_eq!(d[0].direction, Some(Direction::Right));
    }

    #[test]
    fn chin_projection_is_proportional_and_capped() {
        let m = MeasurementBundle {
            chin_projection: 19.0,
            ..balanced()
        };
        assert_relative_eq!(only(&m, Rule::Chin)[0].magnitude.value(), 0.05, epsilon = 1e-5);

        let m = MeasurementBundle {
            chin_projection: -4.0,
            ..balanced()
        };
        assert_eq!(only(&m, Rule::Chin)[0].magnitude, Magnitude::Fraction(0.15));

        let m = MeasurementBundle {
            chin_projection: 20.0,
            ..balanced()
        };
        assert!(only(&m, Rule::Chin).is_empty());
    }

    #[test]
    fn thirds_placeholders_are_disclosed_and_counted() {
        let m = MeasurementBundle {
            facial_thirds: FacialThirds {
                upper: 40.0,
                middle: 26.0,
                lower: 34.0,
            },
            ..balanced()
        };
        let d = only(&m, Rule::FacialThirds);
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].region, Region::UpperThird);
        assert_eq!(d[0].rendering, Rendering::NonVisual(NonVisualReason::SurgeryOnly));
        assert_eq!(d[0].effective_magnitude(), 0.0);
        assert_eq!(d[1].operation, Operation::CheekFill);
        assert!(d[1].is_visual());
        assert_relative_eq!(d[1].magnitude.value(), 0.07, epsilon = 1e-5);

        let recs = recommendations(&d);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("not rendered"));
    }

    #[test]
    fn long_lower_third_is_shortened() {
        let m = MeasurementBundle {
            facial_thirds: FacialThirds {
                upper: 30.0,
                middle: 30.0,
                lower: 40.0,
            },
            chin_projection: 59.8,
            ..balanced()
        };
        let all = plan(&m, &DEFAULT_TARGETS);
        assert_eq!(all.len(), 1);
        let d = &all[0];
        assert_eq!(d.region, Region::LowerThird);
        assert_eq!(d.operation, Operation::VerticalStretch);
        assert_eq!(d.direction, Some(Direction::Up));
        assert!(d.is_visual());
        // 60% of the 6 point excess.
        assert_relative_eq!(d.magnitude.value(), 0.036, epsilon = 1e-5);
        assert!(d.disclosure.contains("40.0% -> 34.0%"));
        assert!(!d.disclosure.contains("chin and jaw"));
    }

    #[test]
    fn short_lower_third_is_lengthened_up_to_cap() {
        let m = MeasurementBundle {
            facial_thirds: FacialThirds {
                upper: 36.0,
                middle: 36.0,
                lower: 28.0,
            },
            ..balanced()
        };
        let d = only(&m, Rule::FacialThirds);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].direction, Some(Direction::Down));
        assert_relative_eq!(d[0].magnitude.value(), 0.036, epsilon = 1e-5);

        let m = MeasurementBundle {
            facial_thirds: FacialThirds {
                upper: 42.5,
                middle: 42.5,
                lower: 15.0,
            },
            ..balanced()
        };
        let lower: Vec<Directive> = only(&m, Rule::FacialThirds)
            .into_iter()
            .filter(|d| d.region == Region::LowerThird)
            .collect();
        assert_eq!(lower[0].magnitude, Magnitude::Fraction(MAX_LOWER_THIRD_STRETCH));
    }

    #[test]
    fn brow_lift_with_tight_tolerance() {
        let targets = BeautyTargets {
            thirds_tolerance: 0.01,
            ..DEFAULT_TARGETS
        };
        let m = MeasurementBundle {
            facial_thirds: FacialThirds {
                upper: 34.5,
                middle: 32.0,
                lower: 33.5,
            },
            ..balanced()
        };
        let d: Vec<Directive> = plan(&m, &targets)
            .into_iter()
            .filter(|d| d.region == Region::UpperThird)
            .collect();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].operation, Operation::BrowLift);
        // 1.5% of a 180mm face.
        assert_relative_eq!(d[0].magnitude.value(), 2.7, epsilon = 1e-3);
        assert!(d[0].magnitude.value() <= targets.max_brow_lift_mm);
    }

    #[test]
    fn count_matches_violated_rules_in_order() {
        let m = MeasurementBundle {
            symmetry_score: 0.7,
            nose_to_ipd_ratio: 0.80,
            jaw_asymmetry_mm: 4.0,
            chin_projection: 10.0,
            facial_thirds: FacialThirds {
                upper: 25.0,
                middle: 38.0,
                lower: 37.0,
            },
            ..balanced()
        };
        let d = plan(&m, &DEFAULT_TARGETS);
        assert_eq!(
            violated_rules(&d),
            vec![Rule::Symmetry, Rule::Nose, Rule::Jaw, Rule::Chin, Rule::FacialThirds]
        );
        let rules: Vec<Rule> = d.iter().map(|d| d.rule).collect();
        let mut sorted = rules.clone();
        sorted.sort();
        assert_eq!(rules, sorted);
        assert!(d.iter().all(|d| !d.disclosure.is_empty() && !d.label.is_empty()));
    }

    #[test]
    fn planning_is_idempotent() {
        let m = MeasurementBundle {
            symmetry_score: 0.81,
            nose_to_ipd_ratio: 0.93,
            jaw_asymmetry_mm: -2.5,
            chin_projection: 5.0,
            ..balanced()
        };
        assert_eq!(plan(&m, &DEFAULT_TARGETS), plan(&m, &DEFAULT_TARGETS));
    }

    #[test]
    fn magnitudes_never_exceed_caps() {
        for step in 0..=40 {
            let s = step as f32 / 40.0;
            let m = MeasurementBundle {
                symmetry_score: s,
                nose_to_ipd_ratio: 0.5 + s * 2.0,
                jaw_asymmetry_mm: (s - 0.5) * 20.0,
                chin_projection: (s - 0.5) * 60.0,
                facial_thirds: FacialThirds {
                    upper: 12.0 + s * 30.0,
                    middle: 33.0,
                    lower: 55.0 - s * 30.0,
                },
                ..balanced()
            };
            for d in plan(&m, &DEFAULT_TARGETS) {
                let cap = match d.operation {
                    Operation::SymmetryBlend => DEFAULT_TARGETS.max_symmetry_delta,
                    Operation::WidthNarrow => DEFAULT_TARGETS.max_nose_reduction,
                    Operation::TipRefine => DEFAULT_TARGETS.tip_refinement,
                    Operation::BridgeRefine => DEFAULT_TARGETS.bridge_refinement,
                    Operation::LateralShift => MAX_JAW_CORRECTION_MM,
                    Operation::ForwardProject => MAX_CHIN_PROJECTION,
                    Operation::BrowLift => DEFAULT_TARGETS.max_brow_lift_mm,
                    Operation::CheekFill => DEFAULT_TARGETS.max_cheek_fill,
                    Operation::VerticalStretch => DEFAULT_TARGETS.max_lower_third_stretch,
                    Operation::ProportionBalance => 0.0,
                };
                assert!(
                    d.magnitude.value() <= cap + 1e-6,
                    "{} exceeds cap {}",
                    d,
                    cap
                );
                assert!(d.magnitude.value() >= 0.0);
            }
        }
    }
}
