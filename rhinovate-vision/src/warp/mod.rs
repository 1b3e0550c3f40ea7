//! Image warp engine.
//!
//! Directives are rendered one after another onto the progressively modified
//! image, in the order given. Each region is resolved against the original
//! landmarks, never re-detected on the warped image, so geometric error does
//! not compound across directives.

mod mask;
mod region;
mod transform;

use image::RgbImage;
use serde::Serialize;

use crate::directive::Directive;
use crate::error::Result;
use crate::landmarks::LandmarkSet;

pub use mask::Mask;
pub use region::{
    resolve, Mapping, RegionWarp, MAX_BROW_LIFT_MM, MAX_MIRROR_WEIGHT, MIN_REGION_EXTENT_PX,
};
pub use transform::{sample_bilinear, Homography};

/// A directive that could not be rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarpFailure {
    pub index: usize,
    pub message: String,
}

/// What happened to each directive, by index into the input list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WarpReport {
    pub applied: Vec<usize>,
    /// Placeholders and zero-magnitude directives.
    pub skipped: Vec<usize>,
    pub failed: Vec<WarpFailure>,
}

impl WarpReport {
    pub fn changed_image(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WarpOutput {
    pub image: RgbImage,
    pub report: WarpReport,
}

/// Apply a single directive in place.
pub fn apply_directive(
    image: &mut RgbImage,
    landmarks: &LandmarkSet,
    directive: &Directive,
) -> Result<()> {
    let (width, height) = image.dimensions();
    let warp = resolve(landmarks, directive, width, height)?;
    warp.render(image);
    Ok(())
}

/// Apply `directives` in order. A directive whose region cannot be resolved is
/// reported and skipped; the rest are still applied.
pub fn apply_directives(
    image: &RgbImage,
    landmarks: &LandmarkSet,
    directives: &[Directive],
) -> WarpOutput {
    let mut current = image.clone();
    let mut report = WarpReport::default();

    for (index, directive) in directives.iter().enumerate() {
        if directive.effective_magnitude() <= 0.0 {
            log::debug!("directive {}: {} has no visual effect, skipping", index, directive);
            report.skipped.push(index);
            continue;
        }

        match apply_directive(&mut current, landmarks, directive) {
            Ok(()) => {
                log::debug!("directive {}: applied {}", index, directive);
                report.applied.push(index);
            }
            Err(e) => {
                log::warn!("directive {}: {}", index, e);
                report.failed.push(WarpFailure {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "warp: {} applied, {} skipped, {} failed",
        report.applied.len(),
        report.skipped.len(),
        report.failed.len()
    );

    WarpOutput {
        image: current,
        report,
    }
}
