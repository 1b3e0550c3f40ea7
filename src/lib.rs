pub mod analysis;
pub mod config;
pub mod demo;
mod error;
pub mod harmony;
pub mod response;
pub mod rules;
pub mod storage;

pub use analysis::{Analysis, Analyzer};
pub use error::{AnalysisError, Result};
pub use response::{AnalysisResponse, ErrorResponse};

// Re-export vision types for convenience
pub use rhinovate_vision::{
    Directive, FileLandmarkSource, LandmarkSet, LandmarkSource, MeasurementBundle,
    StaticLandmarkSource,
};
