use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use rhinovate::{
    config, demo, storage, Analysis, AnalysisResponse, Analyzer, ErrorResponse,
    FileLandmarkSource, LandmarkSource, StaticLandmarkSource,
};
use rhinovate_vision::LandmarkFile;

#[derive(Parser)]
#[command(name = "rhinovate")]
#[command(
    version,
    about = "Facial measurement, cosmetic recommendations and before/after simulation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a photo using landmarks from an external detector
    Analyze {
        /// Photo to analyze (JPEG, PNG or WebP)
        image: PathBuf,
        /// Landmark JSON written by the detector for this photo
        #[arg(short, long)]
        landmarks: PathBuf,
        /// Print the response bundle as JSON
        #[arg(long)]
        json: bool,
        /// Write the modified image here
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Store before/after images in the configured upload directory
        #[arg(long)]
        store: bool,
    },
    /// Print the beauty target table in use
    Targets,
    /// Render a synthetic face, save it with its landmarks and analyze it
    Demo {
        /// Where to write the demo image
        #[arg(short, long, default_value = "demo_face.png")]
        out: PathBuf,
        /// Image side length in pixels
        #[arg(long, default_value_t = 400)]
        size: u32,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Analyze {
            image,
            landmarks,
            json,
            out,
            store,
        } => analyze(
            &cfg,
            &image,
            FileLandmarkSource::new(landmarks),
            json,
            out.as_deref(),
            store,
        ),
        Commands::Targets => print_targets(&cfg),
        Commands::Demo { out, size } => run_demo(&cfg, &out, size),
        Commands::Config => open_config(),
    }
}

fn analyze<S: LandmarkSource>(
    cfg: &config::Config,
    image_path: &Path,
    source: S,
    json: bool,
    out: Option<&Path>,
    store: bool,
) -> Result<()> {
    info!("Analyzing {}", image_path.display());
    let img = image::open(image_path)
        .with_context(|| format!("Failed to open image {}", image_path.display()))?;

    let analyzer = Analyzer::new(source, cfg.clone());
    let analysis = match analyzer.analyze(&img) {
        Ok(analysis) => analysis,
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
            }
            warn!("{}", e);
            anyhow::bail!("{}", e.user_message());
        }
    };

    if let Some(path) = out {
        analysis
            .modified
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Modified image written to {}", path.display());
    }

    let stored = if store {
        let after = analysis
            .report
            .changed_image()
            .then_some(&analysis.modified);
        Some(storage::store_pair(cfg, &img.to_rgb8(), after).context("Failed to store images")?)
    } else {
        None
    };

    if json {
        let response = AnalysisResponse::new(&analysis, stored.as_ref());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&analysis);
        if let Some(s) = &stored {
            info!("Before: {}", s.before_url);
            if let Some(url) = &s.after_url {
                info!("After: {}", url);
            }
        }
    }
    Ok(())
}

fn print_summary(analysis: &Analysis) {
    let m = &analysis.measurements;
    info!("Symmetry score: {:.3}", m.symmetry_score);
    info!("Nose-to-IPD ratio: {:.3}", m.nose_to_ipd_ratio);
    info!("Jaw asymmetry: {:+.1}mm", m.jaw_asymmetry_mm);
    info!(
        "Chin projection: {:.1}{}",
        m.chin_projection,
        if m.has_depth { "" } else { " (2D proxy)" }
    );
    info!(
        "Facial thirds: {:.1}% / {:.1}% / {:.1}%",
        m.facial_thirds.upper, m.facial_thirds.middle, m.facial_thirds.lower
    );
    info!("Facial harmony: {}/100", analysis.harmony_score);

    info!("Recommendations:");
    for r in &analysis.recommendations {
        info!("  - {}", r);
    }
    info!(
        "{} ({} rendered, {} not rendered)",
        analysis.user_message(),
        analysis.report.applied.len(),
        analysis.report.skipped.len() + analysis.report.failed.len()
    );
}

fn print_targets(cfg: &config::Config) -> Result<()> {
    let table = toml::to_string_pretty(&cfg.targets)?;
    println!("{}", table);
    Ok(())
}

fn run_demo(cfg: &config::Config, out: &Path, size: u32) -> Result<()> {
    let landmarks = demo::demo_landmarks(size, size);
    let face = demo::draw_face(&landmarks, size, size);
    face.save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    let landmark_path = out.with_extension("json");
    LandmarkFile::from_set(&landmarks)
        .save(&landmark_path)
        .with_context(|| format!("Failed to write {}", landmark_path.display()))?;
    info!(
        "✓ Demo face written to {} (landmarks: {})",
        out.display(),
        landmark_path.display()
    );

    let after = out.with_file_name(format!(
        "after_{}.jpg",
        out.file_stem().and_then(|s| s.to_str()).unwrap_or("demo")
    ));
    analyze(
        cfg,
        out,
        StaticLandmarkSource::from_set(&landmarks),
        false,
        Some(&after),
        false,
    )
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
