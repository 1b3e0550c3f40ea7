use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::Config;

/// Where a stored pair of images ended up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImages {
    pub id: String,
    pub before_path: PathBuf,
    pub before_url: String,
    /// Absent when no directive changed the image.
    pub after_path: Option<PathBuf>,
    pub after_url: Option<String>,
}

fn url_for(cfg: &Config, name: &str) -> String {
    format!("{}/{}", cfg.url_prefix.trim_end_matches('/'), name)
}

/// Write the original as PNG and, when it differs, the modified image as JPEG
/// into the configured upload directory under a fresh uuid.
pub fn store_pair(cfg: &Config, before: &RgbImage, after: Option<&RgbImage>) -> Result<StoredImages> {
    std::fs::create_dir_all(&cfg.upload_dir)
        .with_context(|| format!("creating upload dir {}", cfg.upload_dir.display()))?;

    let id = Uuid::new_v4().to_string();
    let before_name = format!("before_{}.png", id);
    let before_path = cfg.upload_dir.join(&before_name);
    before
        .save_with_format(&before_path, ImageFormat::Png)
        .with_context(|| format!("writing {}", before_path.display()))?;

    let (after_path, after_url) = match after {
        Some(image) => {
            let name = format!("after_{}.jpg", id);
            let path = cfg.upload_dir.join(&name);
            write_jpeg(&path, image, cfg.jpeg_quality)?;
            (Some(path), Some(url_for(cfg, &name)))
        }
        None => (None, None),
    };

    info!("stored images {} in {}", id, cfg.upload_dir.display());
    Ok(StoredImages {
        before_url: url_for(cfg, &before_name),
        id,
        before_path,
        after_path,
        after_url,
    })
}

fn write_jpeg(path: &Path, image: &RgbImage, quality: u8) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality.clamp(1, 100));
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .with_context(|| format!("encoding {}", path.display()))?;
    Ok(())
}
