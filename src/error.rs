use rhinovate_vision::{LandmarkId, VisionError};
use thiserror::Error;

/// Terminal failures of one analysis. Warp failures are not here: they are
/// isolated per directive and reported as warnings on a successful analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No face detected in image")]
    NoFaceDetected,

    #[error("incomplete landmarks: missing {missing:?}")]
    IncompleteLandmarks { missing: Vec<LandmarkId> },

    #[error("measurement {name} out of plausible range: {value}")]
    MeasurementOutOfRange { name: &'static str, value: f32 },

    #[error("landmark detection failed: {0:#}")]
    Detection(anyhow::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Vision(VisionError),
}

impl AnalysisError {
    /// Message suitable for showing to the person who uploaded the photo.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalysisError::NoFaceDetected => {
                "No face found. Please retry with a clear, front-facing photo."
            }
            AnalysisError::IncompleteLandmarks { .. }
            | AnalysisError::MeasurementOutOfRange { .. } => {
                "The face could not be measured reliably. Please retry with a different photo."
            }
            AnalysisError::Image(_) => "The uploaded file could not be read as an image.",
            AnalysisError::Detection(_) | AnalysisError::Vision(_) => {
                "Analysis failed. Please try again later."
            }
        }
    }
}

impl From<VisionError> for AnalysisError {
    fn from(e: VisionError) -> Self {
        match e {
            VisionError::IncompleteLandmarks { missing } => {
                AnalysisError::IncompleteLandmarks { missing }
            }
            VisionError::MeasurementOutOfRange { name, value } => {
                AnalysisError::MeasurementOutOfRange { name, value }
            }
            other => AnalysisError::Vision(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
