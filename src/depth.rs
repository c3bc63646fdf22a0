//! Disparity to metric depth.

use crate::geometry::RigGeometry;

/// Replace every disparity in `grid` with depth in millimetres.
///
/// Cells without a usable disparity get `rig.max_depth_mm()`.
pub fn reconstruct(rig: &RigGeometry, grid: &mut [f32]) {
    for cell in grid.iter_mut().take(rig.depth_cell_count()) {
        *cell = rig.depth_for_disparity(*cell);
    }
}
