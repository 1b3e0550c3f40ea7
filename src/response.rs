//! JSON response bundle handed back to the caller.

use rhinovate_vision::{Directive, MeasurementBundle};
use serde::Serialize;

use crate::analysis::Analysis;
use crate::error::AnalysisError;
use crate::storage::StoredImages;

#[derive(Debug, Clone, Serialize)]
pub struct DirectiveSummary {
    #[serde(flatten)]
    pub directive: Directive,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub message: String,
    pub symmetry_score: f32,
    pub facial_harmony_score: u8,
    pub measurements: MeasurementBundle,
    /// Readable recommendations followed by any render warnings.
    pub recommendations: Vec<String>,
    /// One per directive, placeholders included.
    pub disclosures: Vec<String>,
    pub warnings: Vec<String>,
    pub procedures: Vec<String>,
    pub directives: Vec<DirectiveSummary>,
    pub total_enhancements: usize,
    pub before_url: Option<String>,
    pub after_url: Option<String>,
}

impl AnalysisResponse {
    pub fn new(analysis: &Analysis, stored: Option<&StoredImages>) -> Self {
        let directives = analysis
            .directives
            .iter()
            .enumerate()
            .map(|(i, d)| DirectiveSummary {
                directive: d.clone(),
                applied: analysis.report.applied.contains(&i),
            })
            .collect();

        Self {
            success: true,
            message: analysis.user_message(),
            symmetry_score: analysis.measurements.symmetry_score,
            facial_harmony_score: analysis.harmony_score,
            measurements: analysis.measurements.clone(),
            recommendations: analysis.recommendations.clone(),
            disclosures: analysis.disclosures().into_iter().map(String::from).collect(),
            warnings: analysis.warnings.clone(),
            procedures: analysis.procedure_labels.clone(),
            directives,
            total_enhancements: analysis.enhancement_count(),
            before_url: stored.map(|s| s.before_url.clone()),
            after_url: stored.and_then(|s| s.after_url.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub no_face: bool,
    pub message: String,
    pub error: String,
}

impl From<&AnalysisError> for ErrorResponse {
    fn from(err: &AnalysisError) -> Self {
        Self {
            success: false,
            no_face: matches!(err, AnalysisError::NoFaceDetected),
            message: err.user_message().to_string(),
            error: err.to_string(),
        }
    }
}
