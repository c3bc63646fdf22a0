//! Stereo frame-pair sources.
//!
//! Sources produce complete packed RGB565 frame pairs:
//! - Synthetic scenes with a known disparity (`stub://` URLs)
//! - Image file pairs (feature: image-io)
//!
//! A session never sees a `StereoPair` directly. `feed_pair` streams both
//! frames into it in fixed-size chunks, alternating sides, the way capture
//! hardware delivers them.

#[cfg(feature = "image-io")]
pub mod image_pair;
pub mod normalize;
pub mod synthetic;

#[cfg(feature = "image-io")]
pub use image_pair::ImagePairSource;
pub use normalize::{normalize_to_rgb565, pack_rgb565, PixelFormat};
pub use synthetic::{SyntheticConfig, SyntheticStereoSource};

use anyhow::{anyhow, Result};

use crate::{CameraSide, FeedOutcome, Session};

/// One frame per camera, each `width * height` little-endian RGB565 samples.
#[derive(Clone, Debug)]
pub struct StereoPair {
    pub width: u32,
    pub height: u32,
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

impl StereoPair {
    pub fn frame(&self, side: CameraSide) -> &[u8] {
        match side {
            CameraSide::Left => &self.left,
            CameraSide::Right => &self.right,
        }
    }
}

/// Stream `pair` into `session` in chunks of at most `chunk_bytes`.
///
/// Returns true when the final chunk completed the pair and the pipeline ran.
pub fn feed_pair(session: &mut Session<'_>, pair: &StereoPair, chunk_bytes: usize) -> Result<bool> {
    if chunk_bytes == 0 {
        return Err(anyhow!("chunk size must be at least one byte"));
    }
    let rig = session.geometry();
    if (pair.width, pair.height) != (rig.width(), rig.height()) {
        return Err(anyhow!(
            "pair is {}x{} but the session expects {}x{}",
            pair.width,
            pair.height,
            rig.width(),
            rig.height()
        ));
    }

    let mut left = pair.left.chunks(chunk_bytes);
    let mut right = pair.right.chunks(chunk_bytes);
    let mut processed = false;
    loop {
        let next = [
            (CameraSide::Left, left.next()),
            (CameraSide::Right, right.next()),
        ];
        if next.iter().all(|(_, chunk)| chunk.is_none()) {
            break;
        }
        for (side, chunk) in next {
            let Some(chunk) = chunk else {
                continue;
            };
            if session.feed(side, chunk)? == FeedOutcome::Processed {
                processed = true;
            }
        }
    }
    Ok(processed)
}

/// Where frame pairs come from.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// `stub://<name>` for synthetic scenes, otherwise a directory holding an
    /// image pair.
    pub url: String,
    pub synthetic: SyntheticConfig,
}

/// Frame-pair source selected by URL.
pub struct StereoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticStereoSource),
    #[cfg(feature = "image-io")]
    Images(ImagePairSource),
}

impl StereoSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.url.starts_with("stub://") {
            log::info!("StereoSource: synthetic scene {}", config.url);
            return Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticStereoSource::new(config.synthetic)?),
            });
        }
        if config.url.contains("://") {
            return Err(anyhow!(
                "unsupported source URL {} (use stub:// or a local directory)",
                config.url
            ));
        }
        #[cfg(feature = "image-io")]
        {
            let dir = std::path::Path::new(&config.url);
            log::info!("StereoSource: image pair in {}", dir.display());
            Ok(Self {
                backend: SourceBackend::Images(ImagePairSource::from_dir(dir)),
            })
        }
        #[cfg(not(feature = "image-io"))]
        {
            Err(anyhow!(
                "image pair sources require the image-io feature ({})",
                config.url
            ))
        }
    }

    pub fn next_pair(&mut self) -> Result<StereoPair> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_pair(),
            #[cfg(feature = "image-io")]
            SourceBackend::Images(source) => source.next_pair(),
        }
    }

    pub fn pairs_produced(&self) -> u64 {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.pairs_generated(),
            #[cfg(feature = "image-io")]
            SourceBackend::Images(source) => source.pairs_loaded(),
        }
    }
}
