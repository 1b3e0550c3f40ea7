//! Analysis pipeline: landmark source, measurements, rules, warps.

use image::{DynamicImage, RgbImage};
use log::{info, warn};
use rhinovate_vision::{
    apply_directives, measure, Directive, LandmarkSet, LandmarkSource, MeasurementBundle,
    WarpReport,
};

use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::harmony::harmony_score;
use crate::rules;

/// Outcome of one successful analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub landmarks: LandmarkSet,
    pub measurements: MeasurementBundle,
    /// In rules-engine order, placeholders included.
    pub directives: Vec<Directive>,
    pub recommendations: Vec<String>,
    /// One entry per directive that could not be rendered.
    pub warnings: Vec<String>,
    pub procedure_labels: Vec<String>,
    pub harmony_score: u8,
    pub report: WarpReport,
    pub modified: RgbImage,
}

impl Analysis {
    /// One disclosure per directive, in application order.
    pub fn disclosures(&self) -> Vec<&str> {
        self.directives.iter().map(|d| d.disclosure.as_str()).collect()
    }

    pub fn enhancement_count(&self) -> usize {
        self.directives.len()
    }

    /// Short status line for the caller.
    pub fn user_message(&self) -> String {
        match self.warnings.len() {
            0 => format!("Analysis complete: {} enhancement(s) recommended", self.enhancement_count()),
            n => format!(
                "Analysis succeeded but {} enhancement(s) could not be rendered",
                n
            ),
        }
    }
}

/// Runs the full pipeline against a landmark source.
///
/// The analyzer holds no per-request state; one instance can serve any number
/// of images as long as the source is safe to share.
pub struct Analyzer<S: LandmarkSource> {
    source: S,
    config: Config,
}

impl<S: LandmarkSource> Analyzer<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self { source, config }
    }

    /// Locate and measure the face without planning or rendering anything.
    pub fn measure(&self, image: &DynamicImage) -> Result<(LandmarkSet, MeasurementBundle)> {
        let raw = self
            .source
            .locate(image)
            .map_err(AnalysisError::Detection)?
            .filter(|raw| !raw.is_empty())
            .ok_or(AnalysisError::NoFaceDetected)?;

        let landmarks = LandmarkSet::from_mesh(&raw)?;
        let measurements = measure(&landmarks)?;
        Ok((landmarks, measurements))
    }

    pub fn analyze(&self, image: &DynamicImage) -> Result<Analysis> {
        let (landmarks, measurements) = self.measure(image)?;
        let targets = &self.config.targets;

        let directives = rules::plan(&measurements, targets);
        info!(
            "{} directive(s) from {} violated rule(s)",
            directives.len(),
            rules::violated_rules(&directives).len()
        );

        let original = image.to_rgb8();
        let output = apply_directives(&original, &landmarks, &directives);

        let warnings: Vec<String> = output
            .report
            .failed
            .iter()
            .map(|f| {
                let label = directives
                    .get(f.index)
                    .map_or("enhancement", |d| d.label.as_str());
                format!("Could not render {}: {}", label, f.message)
            })
            .collect();
        for w in &warnings {
            warn!("{}", w);
        }

        let mut recommendations = rules::recommendations(&directives);
        recommendations.extend(warnings.iter().cloned());

        Ok(Analysis {
            harmony_score: harmony_score(&measurements, targets, directives.len()),
            procedure_labels: rules::procedure_labels(&directives),
            landmarks,
            measurements,
            recommendations,
            warnings,
            directives,
            report: output.report,
            modified: output.image,
        })
    }
}
