//! Pipeline result observers.
//!
//! Observers run synchronously inside `Session::feed`, in a fixed order:
//! left intensity, right intensity, disparity, depth. They receive borrowed
//! views that are only valid for the duration of the call; nothing they are
//! handed transfers ownership of a session buffer.
//!
//! Closures with the matching signature implement the traits directly, so
//! any captured state plays the role of the opaque context pointer.

use crate::intensity::IntensityView;
use crate::CameraSide;

/// Read-only view over a row-major depth-grid buffer.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [f32],
    width: usize,
    height: usize,
}

impl<'a> GridView<'a> {
    pub(crate) fn new(cells: &'a [f32], width: usize, height: usize) -> Self {
        debug_assert!(cells.len() >= width * height);
        Self {
            cells: &cells[..width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[y * self.width + x]
    }

    pub fn cells(&self) -> &'a [f32] {
        self.cells
    }
}

/// Called once per side after the frame is converted to intensity.
pub trait IntensityObserver {
    fn on_intensity(&mut self, side: CameraSide, frame: IntensityView<'_>);
}

/// Called once the full disparity grid is available.
pub trait DisparityObserver {
    fn on_disparity(&mut self, disparity: GridView<'_>);
}

/// Called once the depth grid is reconstructed.
pub trait DepthObserver {
    fn on_depth(&mut self, depth: GridView<'_>, max_depth_mm: f32);
}

impl<F> IntensityObserver for F
where
    F: FnMut(CameraSide, IntensityView<'_>),
{
    fn on_intensity(&mut self, side: CameraSide, frame: IntensityView<'_>) {
        self(side, frame)
    }
}

impl<F> DisparityObserver for F
where
    F: FnMut(GridView<'_>),
{
    fn on_disparity(&mut self, disparity: GridView<'_>) {
        self(disparity)
    }
}

impl<F> DepthObserver for F
where
    F: FnMut(GridView<'_>, f32),
{
    fn on_depth(&mut self, depth: GridView<'_>, max_depth_mm: f32) {
        self(depth, max_depth_mm)
    }
}

/// Optional observer per event kind.
#[derive(Default)]
pub(crate) struct Observers<'a> {
    pub(crate) intensity: Option<Box<dyn IntensityObserver + 'a>>,
    pub(crate) disparity: Option<Box<dyn DisparityObserver + 'a>>,
    pub(crate) depth: Option<Box<dyn DepthObserver + 'a>>,
}

impl Observers<'_> {
    pub(crate) fn intensity(&mut self, side: CameraSide, frame: IntensityView<'_>) {
        if let Some(observer) = self.intensity.as_mut() {
            observer.on_intensity(side, frame);
        }
    }

    pub(crate) fn disparity(&mut self, disparity: GridView<'_>) {
        if let Some(observer) = self.disparity.as_mut() {
            observer.on_disparity(disparity);
        }
    }

    pub(crate) fn depth(&mut self, depth: GridView<'_>, max_depth_mm: f32) {
        if let Some(observer) = self.depth.as_mut() {
            observer.on_depth(depth, max_depth_mm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_view_indexes_row_major() {
        let cells = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 99.0];
        let view = GridView::new(&cells, 3, 2);
        assert_eq!(view.get(0, 0), 1.0);
        assert_eq!(view.get(2, 0), 3.0);
        assert_eq!(view.get(1, 1), 5.0);
        assert_eq!(view.cells().len(), 6);
    }

    #[test]
    fn closures_act_as_observers() {
        let mut seen = Vec::new();
        {
            let mut observers = Observers::default();
            observers.depth = Some(Box::new(|grid: GridView<'_>, max: f32| {
                seen.push((grid.cells().to_vec(), max));
            }));
            observers.disparity(GridView::new(&[1.0], 1, 1));
            observers.depth(GridView::new(&[7.5], 1, 1), 28.5);
        }
        assert_eq!(seen, vec![(vec![7.5], 28.5)]);
    }
}
