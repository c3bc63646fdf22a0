//! Summaries of disparity and depth grids for tools and logs.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::observer::GridView;

/// Per-grid statistics, serialized into tool summaries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MapStats {
    pub width: usize,
    pub height: usize,
    pub cells: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// Cells equal to the sentinel, when one was given.
    pub sentinel_cells: usize,
    pub zero_cells: usize,
}

impl MapStats {
    pub fn from_grid(grid: &GridView<'_>, sentinel: Option<f32>) -> Self {
        let cells = grid.cells();
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut sentinel_cells = 0;
        let mut zero_cells = 0;
        for &value in cells {
            min = min.min(value);
            max = max.max(value);
            sum += f64::from(value);
            if sentinel == Some(value) {
                sentinel_cells += 1;
            }
            if value == 0.0 {
                zero_cells += 1;
            }
        }
        if cells.is_empty() {
            min = 0.0;
            max = 0.0;
        }
        let mean = if cells.is_empty() {
            0.0
        } else {
            (sum / cells.len() as f64) as f32
        };
        Self {
            width: grid.width(),
            height: grid.height(),
            cells: cells.len(),
            min,
            max,
            mean,
            sentinel_cells,
            zero_cells,
        }
    }

    /// Share of cells that carry a real measurement rather than the sentinel.
    pub fn coverage(&self) -> f32 {
        if self.cells == 0 {
            return 0.0;
        }
        1.0 - self.sentinel_cells as f32 / self.cells as f32
    }
}

/// Hex SHA-256 over the grid's cells as little-endian `f32` bytes.
pub fn map_digest(grid: &GridView<'_>) -> String {
    let mut hasher = Sha256::new();
    for value in grid.cells() {
        hasher.update(value.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Depth grid as 8-bit gray: sentinel cells black, the rest `depth / max`.
#[cfg(feature = "image-io")]
pub fn render_depth(grid: &GridView<'_>, max_depth_mm: f32) -> image::GrayImage {
    render(grid, |depth| {
        if depth >= max_depth_mm {
            0.0
        } else {
            depth / max_depth_mm
        }
    })
}

/// Disparity grid as 8-bit gray, scaled by the frame width in pixels.
#[cfg(feature = "image-io")]
pub fn render_disparity(grid: &GridView<'_>, frame_width: u32) -> image::GrayImage {
    let scale = frame_width.max(1) as f32;
    render(grid, |disparity| disparity / scale)
}

#[cfg(feature = "image-io")]
fn render(grid: &GridView<'_>, normalize: impl Fn(f32) -> f32) -> image::GrayImage {
    image::GrayImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        let level = normalize(grid.get(x as usize, y as usize)).clamp(0.0, 1.0);
        image::Luma([(level * 255.0).round() as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_sentinel_and_zero_cells() {
        let cells = [0.0, 5.0, 28.56, 28.56];
        let grid = GridView::new(&cells, 2, 2);
        let stats = MapStats::from_grid(&grid, Some(28.56));
        assert_eq!(stats.cells, 4);
        assert_eq!(stats.sentinel_cells, 2);
        assert_eq!(stats.zero_cells, 1);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 28.56);
        assert!((stats.mean - 15.53).abs() < 1e-3);
        assert!((stats.coverage() - 0.5).abs() < f32::EPSILON);

        let json = serde_json::to_value(stats).expect("serialize");
        assert_eq!(json["sentinel_cells"], 2);
    }

    #[test]
    fn digest_tracks_cell_values() {
        let a = [1.0f32, 2.0];
        let b = [1.0f32, 2.5];
        let digest = map_digest(&GridView::new(&a, 2, 1));
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, map_digest(&GridView::new(&a, 2, 1)));
        assert_ne!(digest, map_digest(&GridView::new(&b, 2, 1)));
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        let empty: [f32; 0] = [];
        assert_eq!(
            map_digest(&GridView::new(&empty, 0, 0)),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[cfg(feature = "image-io")]
    #[test]
    fn depth_render_blacks_out_sentinel() {
        let cells = [10.0, 20.0, 40.0, 0.0];
        let img = render_depth(&GridView::new(&cells, 2, 2), 40.0);
        assert_eq!(img.get_pixel(0, 0).0, [64]);
        assert_eq!(img.get_pixel(1, 0).0, [128]);
        assert_eq!(img.get_pixel(0, 1).0, [0]);
        assert_eq!(img.get_pixel(1, 1).0, [0]);
    }
}
