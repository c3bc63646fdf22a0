//! Block-matching disparity search.
//!
//! For every depth-grid cell, the left (reference) window anchored at the
//! cell's pixel origin is compared with right-view windows at the same row,
//! sliding from the aligned position toward x = 0. The right view is assumed
//! to be shifted left of the reference, so larger x is never searched.

use crate::compare::{BlockComparer, BlockOrigin};
use crate::geometry::RigGeometry;
use crate::intensity::IntensityView;

/// Disparity, in pixels, for the grid cell `(cell_x, cell_y)`.
///
/// Ties keep the first candidate seen, which is the one closest to aligned.
pub fn search_cell(
    rig: &RigGeometry,
    comparer: &dyn BlockComparer,
    reference: &IntensityView<'_>,
    candidate: &IntensityView<'_>,
    cell_x: usize,
    cell_y: usize,
) -> usize {
    let block = rig.block_size() as usize;
    let start = BlockOrigin::new(cell_x * block, cell_y * block);

    let mut best_x = start.x;
    let mut best_score = u32::MAX;
    for candidate_x in (0..=start.x).rev() {
        let score = comparer.score(
            rig,
            reference,
            candidate,
            start,
            BlockOrigin::new(candidate_x, start.y),
            block,
        );
        if score < best_score {
            best_score = score;
            best_x = candidate_x;
        }
    }

    start.x.abs_diff(best_x)
}

/// Fill `grid` (row-major, `depth_width x depth_height`) with per-cell disparities.
pub fn estimate(
    rig: &RigGeometry,
    comparer: &dyn BlockComparer,
    left: &IntensityView<'_>,
    right: &IntensityView<'_>,
    grid: &mut [f32],
) {
    let grid_width = rig.depth_width() as usize;
    for (index, cell) in grid
        .iter_mut()
        .take(rig.depth_cell_count())
        .enumerate()
    {
        let disparity = search_cell(
            rig,
            comparer,
            left,
            right,
            index % grid_width,
            index / grid_width,
        );
        *cell = disparity as f32;
    }
}
