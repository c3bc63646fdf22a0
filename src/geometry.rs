//! Stereo rig geometry and depth-grid layout.
//!
//! `RigGeometry` is validated once at construction. Every derived quantity
//! (buffer sizes, grid dimensions, focal length, depth sentinel) is computed
//! here so the rest of the pipeline never re-derives it.

use anyhow::{anyhow, Result};
use serde::Serialize;

/// Bytes per raw-frame sample (packed RGB565, later intensity).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bytes per depth-grid cell (`f32`).
pub const BYTES_PER_CELL: usize = 4;

/// Largest supported search window edge.
pub const MAX_BLOCK_SIZE: u32 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RigGeometry {
    width: u32,
    height: u32,
    block_size: u32,
    baseline_mm: f32,
    fov_degrees: f32,
    focal_length_pixels: f32,
    max_depth_mm: f32,
    depth_width: u32,
    depth_height: u32,
}

impl RigGeometry {
    /// Validate rig parameters and derive the grid layout.
    ///
    /// Fails unless `block_size` divides both `width` and `height` exactly.
    pub fn new(
        width: u32,
        height: u32,
        block_size: u32,
        baseline_mm: f32,
        fov_degrees: f32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "frame dimensions must be non-zero (got {}x{})",
                width,
                height
            ));
        }
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(anyhow!(
                "block size must be in 1..={} (got {})",
                MAX_BLOCK_SIZE,
                block_size
            ));
        }
        if width % block_size != 0 || height % block_size != 0 {
            return Err(anyhow!(
                "block size {} must evenly divide both width {} and height {}",
                block_size,
                width,
                height
            ));
        }
        if !baseline_mm.is_finite() || baseline_mm <= 0.0 {
            return Err(anyhow!("baseline must be a positive distance in mm"));
        }
        if !fov_degrees.is_finite() || fov_degrees <= 0.0 || fov_degrees >= 180.0 {
            return Err(anyhow!(
                "field of view must be within (0, 180) degrees (got {})",
                fov_degrees
            ));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_SAMPLE))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        let half_fov_radians = (fov_degrees * 0.5).to_radians();
        let focal_length_pixels = (width as f32 * 0.5) / half_fov_radians.tan();

        Ok(Self {
            width,
            height,
            block_size,
            baseline_mm,
            fov_degrees,
            focal_length_pixels,
            // Depth implied by a one-pixel disparity; nothing farther is representable.
            max_depth_mm: focal_length_pixels * baseline_mm,
            depth_width: width / block_size,
            depth_height: height / block_size,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn baseline_mm(&self) -> f32 {
        self.baseline_mm
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    /// Focal length expressed in pixels, derived from width and field of view.
    pub fn focal_length_pixels(&self) -> f32 {
        self.focal_length_pixels
    }

    /// Sentinel written for cells without a usable disparity.
    pub fn max_depth_mm(&self) -> f32 {
        self.max_depth_mm
    }

    pub fn depth_width(&self) -> u32 {
        self.depth_width
    }

    pub fn depth_height(&self) -> u32 {
        self.depth_height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of one raw-frame buffer.
    pub fn frame_buffer_size(&self) -> usize {
        self.pixel_count() * BYTES_PER_SAMPLE
    }

    pub fn depth_cell_count(&self) -> usize {
        self.depth_width as usize * self.depth_height as usize
    }

    /// Size in bytes of the depth buffer.
    pub fn depth_buffer_size(&self) -> usize {
        self.depth_cell_count() * BYTES_PER_CELL
    }

    /// Metric depth for a disparity in pixels.
    ///
    /// Disparities outside `[1, width)` carry no usable match and map to the
    /// maximum depth sentinel.
    pub fn depth_for_disparity(&self, disparity: f32) -> f32 {
        if disparity >= 1.0 && disparity < self.width as f32 {
            self.focal_length_pixels * self.baseline_mm / disparity
        } else {
            self.max_depth_mm
        }
    }
}
