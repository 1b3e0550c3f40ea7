use thiserror::Error;

use crate::landmarks::LandmarkId;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("incomplete landmarks: missing {missing:?}")]
    IncompleteLandmarks { missing: Vec<LandmarkId> },

    #[error("measurement {name} out of plausible range: {value}")]
    MeasurementOutOfRange { name: &'static str, value: f32 },

    #[error("cannot resolve warp region for {directive}: {reason}")]
    WarpRegion { directive: String, reason: String },

    #[error("reading landmark file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing landmark file: {0}")]
    LandmarkFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VisionError>;
