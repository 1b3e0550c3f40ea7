pub mod directive;
mod error;
pub mod geometry;
pub mod landmarks;
pub mod measure;
pub mod warp;

// Re-export commonly used types
pub use directive::{Directive, Direction, Magnitude, NonVisualReason, Operation, Region, Rendering, Rule};
pub use error::{Result, VisionError};
pub use geometry::Point;
pub use landmarks::{
    reference_face, FileLandmarkSource, LandmarkFile, LandmarkId, LandmarkSet, LandmarkSource,
    RawLandmarks, RawPoint, StaticLandmarkSource,
};
pub use measure::{measure, FacialThirds, MeasurementBundle};
pub use warp::{apply_directives, WarpOutput, WarpReport};
