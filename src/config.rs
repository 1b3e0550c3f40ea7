use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("RHINOVATE_CONFIG_PATH").unwrap_or("/usr/local/etc/rhinovate/config.toml"))
});

pub const TARGET_SYMMETRY: f32 = 0.9;
pub const MAX_SYMMETRY_DELTA: f32 = 0.15;

pub const IDEAL_NOSE_TO_IPD: f32 = 0.75;
pub const MAX_NOSE_REDUCTION: f32 = 0.30;
/// Width reduction per unit of relative excess over the ideal ratio.
pub const NOSE_SEVERITY_GAIN: f32 = 2.0;
pub const TIP_REFINEMENT: f32 = 0.15;
/// Width reduction above which the tip is refined as well.
pub const TIP_REFINEMENT_THRESHOLD: f32 = 0.15;
pub const BRIDGE_REFINEMENT: f32 = 0.10;
/// Width reduction above which the bridge is narrowed as well.
pub const BRIDGE_REFINEMENT_THRESHOLD: f32 = 0.12;

pub const JAW_TOLERANCE_MM: f32 = 1.0;
pub const MAX_JAW_CORRECTION_MM: f32 = 2.0;

pub const CHIN_PROJECTION_THRESHOLD: f32 = 20.0;
pub const MAX_CHIN_PROJECTION: f32 = 0.15;

pub const IDEAL_UPPER_THIRD: f32 = 0.33;
pub const IDEAL_MIDDLE_THIRD: f32 = 0.33;
pub const IDEAL_LOWER_THIRD: f32 = 0.34;
pub const THIRDS_TOLERANCE: f32 = 0.05;
/// Upper-third deviations up to this size can be shown as a brow lift.
pub const BROW_LIFT_BAND: f32 = 0.02;
pub const MAX_BROW_LIFT_MM: f32 = 3.0;
pub const MAX_CHEEK_FILL: f32 = 0.15;
/// Lower-third stretch per unit of deviation from the ideal share.
pub const LOWER_THIRD_STRETCH_GAIN: f32 = 0.6;
pub const MAX_LOWER_THIRD_STRETCH: f32 = 0.10;

/// Ideal values, tolerances and correction caps used by the rules engine.
///
/// Fractions are 0..1 (0.30 is a 30% reduction); lengths are mm-equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeautyTargets {
    pub target_symmetry: f32,
    pub max_symmetry_delta: f32,
    pub ideal_nose_to_ipd: f32,
    pub max_nose_reduction: f32,
    pub nose_severity_gain: f32,
    pub tip_refinement: f32,
    pub tip_refinement_threshold: f32,
    pub bridge_refinement: f32,
    pub bridge_refinement_threshold: f32,
    pub jaw_tolerance_mm: f32,
    pub max_jaw_correction_mm: f32,
    pub chin_projection_threshold: f32,
    pub max_chin_projection: f32,
    pub ideal_upper_third: f32,
    pub ideal_middle_third: f32,
    pub ideal_lower_third: f32,
    pub thirds_tolerance: f32,
    pub brow_lift_band: f32,
    pub max_brow_lift_mm: f32,
    pub max_cheek_fill: f32,
    pub lower_third_stretch_gain: f32,
    pub max_lower_third_stretch: f32,
}

pub const DEFAULT_TARGETS: BeautyTargets = BeautyTargets {
    target_symmetry: TARGET_SYMMETRY,
    max_symmetry_delta: MAX_SYMMETRY_DELTA,
    ideal_nose_to_ipd: IDEAL_NOSE_TO_IPD,
    max_nose_reduction: MAX_NOSE_REDUCTION,
    nose_severity_gain: NOSE_SEVERITY_GAIN,
    tip_refinement: TIP_REFINEMENT,
    tip_refinement_threshold: TIP_REFINEMENT_THRESHOLD,
    bridge_refinement: BRIDGE_REFINEMENT,
    bridge_refinement_threshold: BRIDGE_REFINEMENT_THRESHOLD,
    jaw_tolerance_mm: JAW_TOLERANCE_MM,
    max_jaw_correction_mm: MAX_JAW_CORRECTION_MM,
    chin_projection_threshold: CHIN_PROJECTION_THRESHOLD,
    max_chin_projection: MAX_CHIN_PROJECTION,
    ideal_upper_third: IDEAL_UPPER_THIRD,
    ideal_middle_third: IDEAL_MIDDLE_THIRD,
    ideal_lower_third: IDEAL_LOWER_THIRD,
    thirds_tolerance: THIRDS_TOLERANCE,
    brow_lift_band: BROW_LIFT_BAND,
    max_brow_lift_mm: MAX_BROW_LIFT_MM,
    max_cheek_fill: MAX_CHEEK_FILL,
    lower_third_stretch_gain: LOWER_THIRD_STRETCH_GAIN,
    max_lower_third_stretch: MAX_LOWER_THIRD_STRETCH,
};

impl Default for BeautyTargets {
    fn default() -> Self {
        DEFAULT_TARGETS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where before/after images are written.
    pub upload_dir: PathBuf,
    /// Prefix of the URLs handed back for stored images.
    pub url_prefix: String,
    pub jpeg_quality: u8,
    pub targets: BeautyTargets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            url_prefix: "/uploads".to_string(),
            jpeg_quality: 95,
            targets: DEFAULT_TARGETS,
        }
    }
}

fn default_upload_dir() -> PathBuf {
    ProjectDirs::from("", "", "rhinovate")
        .map(|dirs| dirs.data_dir().join("uploads"))
        .unwrap_or_else(|| PathBuf::from("uploads"))
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() -> Result<()> {
        let cfg = load_config(Some(Path::new("/nonexistent/rhinovate/config.toml")))?;
        assert_eq!(cfg.targets, DEFAULT_TARGETS);
        assert_eq!(cfg.jpeg_quality, 95);
        Ok(())
    }

    #[test]
    fn partial_targets_keep_remaining_defaults() -> Result<()> {
        let cfg: Config = toml::from_str(
            r#"
url_prefix = "/static"

[targets]
target_symmetry = 0.95
"#,
        )?;
        assert_eq!(cfg.url_prefix, "/static");
        assert_eq!(cfg.targets.target_symmetry, 0.95);
        assert_eq!(cfg.targets.max_nose_reduction, MAX_NOSE_REDUCTION);
        Ok(())
    }

    #[test]
    fn save_then_load() -> Result<()> {
        let path = std::env::temp_dir()
            .join(format!("rhinovate-config-{}", std::process::id()))
            .join("config.toml");
        let mut cfg = Config::default();
        cfg.jpeg_quality = 80;
        cfg.targets.jaw_tolerance_mm = 0.5;
        save_config(&cfg, Some(&path))?;

        let loaded = load_config(Some(&path))?;
        assert_eq!(loaded.jpeg_quality, 80);
        assert_eq!(loaded.targets.jaw_tolerance_mm, 0.5);
        assert_eq!(loaded.upload_dir, cfg.upload_dir);
        Ok(())
    }
}
