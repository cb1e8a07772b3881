//! Shared fixtures for unit tests.

use std::cell::Cell;
use std::rc::Rc;

use crate::geometry::Point;
use crate::surface::{CellMetrics, EditableSurface, GridSurface, Viewport};

/// Grid surface at the viewport origin with 8x16 cells, `columns` wide.
pub fn grid(text: &str, columns: usize) -> GridSurface {
    let viewport = Viewport::new(Point::new(0.0, 0.0), columns as f32 * 8.0, 160.0);
    let mut surface = GridSurface::new(viewport, CellMetrics::default());
    surface.set_content(text);
    surface.take_notifications();
    surface
}

/// Frame requester that only counts requests.
#[derive(Debug, Clone, Default)]
pub struct CountingFrames(Rc<Cell<usize>>);

impl CountingFrames {
    pub fn requester(&self) -> impl FnMut() + 'static {
        let count = self.0.clone();
        move || count.set(count.get() + 1)
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }
}
