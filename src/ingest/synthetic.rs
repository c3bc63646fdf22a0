//! Synthetic stereo scenes for tests, demos and the `stub://` source.
//!
//! The left view is random texture. The right view is the same texture shifted
//! left by a known disparity, so block matching should recover that disparity
//! wherever the shifted block is fully visible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use anyhow::{anyhow, Result};

use super::normalize::{normalize_to_rgb565, PixelFormat};
use super::StereoPair;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Shift of the background plane, in pixels.
    pub disparity_px: u32,
    /// Shift of a centred square occupying half the frame, if any.
    pub foreground_disparity_px: Option<u32>,
    /// Fixed seed for reproducible scenes; random when unset.
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            disparity_px: 8,
            foreground_disparity_px: None,
            seed: None,
        }
    }
}

pub struct SyntheticStereoSource {
    config: SyntheticConfig,
    rng: StdRng,
    pairs_generated: u64,
}

impl SyntheticStereoSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("synthetic scene needs non-zero dimensions"));
        }
        let widest = config
            .disparity_px
            .max(config.foreground_disparity_px.unwrap_or(0));
        if widest >= config.width {
            return Err(anyhow!(
                "disparity {} must be smaller than frame width {}",
                widest,
                config.width
            ));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            rng,
            pairs_generated: 0,
        })
    }

    pub fn pairs_generated(&self) -> u64 {
        self.pairs_generated
    }

    /// Generate the next scene as packed RGB565 frames.
    pub fn next_pair(&mut self) -> Result<StereoPair> {
        let w = self.config.width as usize;
        let h = self.config.height as usize;

        let mut left = vec![0u8; w * h * 3];
        self.rng.fill(left.as_mut_slice());

        let mut right = vec![0u8; w * h * 3];
        for y in 0..h {
            for x in 0..w {
                let shift = self.disparity_at(x, y);
                let dst = (y * w + x) * 3;
                if x + shift < w {
                    let src = (y * w + x + shift) * 3;
                    right[dst..dst + 3].copy_from_slice(&left[src..src + 3]);
                } else {
                    // Nothing in the left view lands here; fill with fresh texture.
                    self.rng.fill(&mut right[dst..dst + 3]);
                }
            }
        }

        let (width, height) = (self.config.width, self.config.height);
        self.pairs_generated += 1;
        Ok(StereoPair {
            width,
            height,
            left: normalize_to_rgb565(&left, width, height, PixelFormat::Rgb24)?,
            right: normalize_to_rgb565(&right, width, height, PixelFormat::Rgb24)?,
        })
    }

    /// Disparity of the surface visible at right-view pixel `(x, y)`.
    fn disparity_at(&self, x: usize, y: usize) -> usize {
        let background = self.config.disparity_px as usize;
        let Some(foreground) = self.config.foreground_disparity_px else {
            return background;
        };
        let w = self.config.width as usize;
        let h = self.config.height as usize;
        let inside = (w / 4..w - w / 4).contains(&x) && (h / 4..h - h / 4).contains(&y);
        if inside {
            foreground as usize
        } else {
            background
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frame: &[u8], width: usize, x: usize, y: usize) -> u16 {
        let i = (y * width + x) * 2;
        u16::from_le_bytes([frame[i], frame[i + 1]])
    }

    #[test]
    fn right_view_is_left_view_shifted() -> Result<()> {
        let mut source = SyntheticStereoSource::new(SyntheticConfig {
            width: 32,
            height: 8,
            disparity_px: 5,
            foreground_disparity_px: None,
            seed: Some(7),
        })?;
        let pair = source.next_pair()?;
        assert_eq!(pair.left.len(), 32 * 8 * 2);
        for y in 0..8 {
            for x in 0..27 {
                assert_eq!(sample(&pair.right, 32, x, y), sample(&pair.left, 32, x + 5, y));
            }
        }
        assert_eq!(source.pairs_generated(), 1);
        Ok(())
    }

    #[test]
    fn seeded_sources_are_reproducible() -> Result<()> {
        let cfg = SyntheticConfig {
            width: 16,
            height: 16,
            disparity_px: 2,
            foreground_disparity_px: Some(4),
            seed: Some(99),
        };
        let a = SyntheticStereoSource::new(cfg.clone())?.next_pair()?;
        let b = SyntheticStereoSource::new(cfg)?.next_pair()?;
        assert_eq!(a.left, b.left);
        assert_eq!(a.right, b.right);
        Ok(())
    }

    #[test]
    fn rejects_disparity_wider_than_frame() {
        let cfg = SyntheticConfig {
            width: 8,
            height: 8,
            disparity_px: 8,
            ..SyntheticConfig::default()
        };
        assert!(SyntheticStereoSource::new(cfg).is_err());
    }
}
