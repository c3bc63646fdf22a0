//! Stereo pairs loaded from image files.
//!
//! A pair directory holds `imL.png` and `imR.png` (the Middlebury layout);
//! individual paths can be given with `ImagePairSource::from_paths`.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::normalize::{normalize_to_rgb565, PixelFormat};
use super::StereoPair;

pub const LEFT_IMAGE_NAME: &str = "imL.png";
pub const RIGHT_IMAGE_NAME: &str = "imR.png";

pub struct ImagePairSource {
    left_path: PathBuf,
    right_path: PathBuf,
    pairs_loaded: u64,
}

impl ImagePairSource {
    pub fn from_dir(dir: &Path) -> Self {
        Self::from_paths(dir.join(LEFT_IMAGE_NAME), dir.join(RIGHT_IMAGE_NAME))
    }

    pub fn from_paths(left_path: PathBuf, right_path: PathBuf) -> Self {
        Self {
            left_path,
            right_path,
            pairs_loaded: 0,
        }
    }

    pub fn pairs_loaded(&self) -> u64 {
        self.pairs_loaded
    }

    /// Decode both images and pack them as RGB565.
    ///
    /// Re-reads the files on every call so a fresh color pair is always
    /// produced.
    pub fn next_pair(&mut self) -> Result<StereoPair> {
        let left = load_rgb(&self.left_path)?;
        let right = load_rgb(&self.right_path)?;
        if left.dimensions() != right.dimensions() {
            return Err(anyhow!(
                "stereo images differ in size: left {:?}, right {:?}",
                left.dimensions(),
                right.dimensions()
            ));
        }
        let (width, height) = left.dimensions();
        log::debug!(
            "ImagePairSource: loaded {} + {} ({}x{})",
            self.left_path.display(),
            self.right_path.display(),
            width,
            height
        );
        self.pairs_loaded += 1;
        Ok(StereoPair {
            width,
            height,
            left: normalize_to_rgb565(left.as_raw(), width, height, PixelFormat::Rgb24)?,
            right: normalize_to_rgb565(right.as_raw(), width, height, PixelFormat::Rgb24)?,
        })
    }
}

fn load_rgb(path: &Path) -> Result<image::RgbImage> {
    let img = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    Ok(img.to_rgb8())
}
