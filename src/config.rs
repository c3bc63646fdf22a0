use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::compare::{BlockComparer, ComparerRegistry, DEFAULT_COMPARER};
use crate::geometry::RigGeometry;
use crate::ingest::{SourceConfig, SyntheticConfig};
use crate::session::SessionConfig;

const DEFAULT_WIDTH: u32 = 256;
const DEFAULT_HEIGHT: u32 = 256;
const DEFAULT_BLOCK_SIZE: u32 = 4;
const DEFAULT_BASELINE_MM: f32 = 10.0;
const DEFAULT_FOV_DEGREES: f32 = 70.0;
const DEFAULT_SOURCE_URL: &str = "stub://stereo";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_CHUNK_BYTES: usize = 4096;
const DEFAULT_DISPARITY_PX: u32 = 8;

#[derive(Debug, Deserialize, Default)]
struct SsvlConfigFile {
    rig: Option<RigConfigFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct RigConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    block_size: Option<u32>,
    baseline_mm: Option<f32>,
    fov_degrees: Option<f32>,
    allocate: Option<bool>,
    comparer: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    chunk_bytes: Option<usize>,
    disparity_px: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SsvlConfig {
    pub rig: RigSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct RigSettings {
    pub width: u32,
    pub height: u32,
    pub block_size: u32,
    pub baseline_mm: f32,
    pub fov_degrees: f32,
    pub allocate: bool,
    pub comparer: String,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub target_fps: u32,
    pub chunk_bytes: usize,
    /// Background shift for `stub://` scenes.
    pub disparity_px: u32,
    pub seed: Option<u64>,
}

impl SsvlConfig {
    /// Defaults, then the TOML file named by `SSVL_CONFIG`, then `SSVL_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SSVL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SsvlConfigFile) -> Self {
        let rig = file.rig.unwrap_or_default();
        let source = file.source.unwrap_or_default();
        Self {
            rig: RigSettings {
                width: rig.width.unwrap_or(DEFAULT_WIDTH),
                height: rig.height.unwrap_or(DEFAULT_HEIGHT),
                block_size: rig.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
                baseline_mm: rig.baseline_mm.unwrap_or(DEFAULT_BASELINE_MM),
                fov_degrees: rig.fov_degrees.unwrap_or(DEFAULT_FOV_DEGREES),
                allocate: rig.allocate.unwrap_or(true),
                comparer: rig
                    .comparer
                    .unwrap_or_else(|| DEFAULT_COMPARER.to_string()),
            },
            source: SourceSettings {
                url: source
                    .url
                    .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string()),
                target_fps: source.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
                chunk_bytes: source.chunk_bytes.unwrap_or(DEFAULT_CHUNK_BYTES),
                disparity_px: source.disparity_px.unwrap_or(DEFAULT_DISPARITY_PX),
                seed: source.seed,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(width) = env_number("SSVL_WIDTH")? {
            self.rig.width = width;
        }
        if let Some(height) = env_number("SSVL_HEIGHT")? {
            self.rig.height = height;
        }
        if let Some(block_size) = env_number("SSVL_BLOCK_SIZE")? {
            self.rig.block_size = block_size;
        }
        if let Some(baseline) = env_number("SSVL_BASELINE_MM")? {
            self.rig.baseline_mm = baseline;
        }
        if let Some(fov) = env_number("SSVL_FOV_DEGREES")? {
            self.rig.fov_degrees = fov;
        }
        if let Ok(comparer) = std::env::var("SSVL_COMPARER") {
            if !comparer.trim().is_empty() {
                self.rig.comparer = comparer.trim().to_string();
            }
        }
        if let Ok(url) = std::env::var("SSVL_SOURCE_URL") {
            if !url.trim().is_empty() {
                self.source.url = url;
            }
        }
        if let Some(fps) = env_number("SSVL_TARGET_FPS")? {
            self.source.target_fps = fps;
        }
        if let Some(chunk) = env_number("SSVL_CHUNK_BYTES")? {
            self.source.chunk_bytes = chunk;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.geometry()?;
        self.rig.comparer = self.rig.comparer.to_lowercase();
        ComparerRegistry::with_builtin().resolve(&self.rig.comparer)?;

        if self.source.target_fps == 0 {
            return Err(anyhow!("target_fps must be greater than zero"));
        }
        if self.source.chunk_bytes == 0 {
            return Err(anyhow!("chunk_bytes must be greater than zero"));
        }
        Ok(())
    }

    pub fn geometry(&self) -> Result<RigGeometry> {
        RigGeometry::new(
            self.rig.width,
            self.rig.height,
            self.rig.block_size,
            self.rig.baseline_mm,
            self.rig.fov_degrees,
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            width: self.rig.width,
            height: self.rig.height,
            block_size: self.rig.block_size,
            baseline_mm: self.rig.baseline_mm,
            fov_degrees: self.rig.fov_degrees,
            allocate: self.rig.allocate,
        }
    }

    /// Built-in comparers with the configured one as default.
    pub fn registry(&self) -> Result<ComparerRegistry> {
        let mut registry = ComparerRegistry::with_builtin();
        registry.set_default(&self.rig.comparer)?;
        Ok(registry)
    }

    pub fn comparer(&self) -> Result<Box<dyn BlockComparer + Send + Sync>> {
        let comparer = self
            .registry()?
            .default_comparer()
            .ok_or_else(|| anyhow!("no comparer registered"))?;
        Ok(Box::new(comparer))
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            url: self.source.url.clone(),
            synthetic: SyntheticConfig {
                width: self.rig.width,
                height: self.rig.height,
                disparity_px: self.source.disparity_px,
                foreground_disparity_px: None,
                seed: self.source.seed,
            },
        }
    }
}

fn read_config_file(path: &Path) -> Result<SsvlConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn env_number<T: FromStr>(key: &str) -> Result<Option<T>> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| anyhow!("{} must be a number, got {:?}", key, raw))
}
