//! Screen geometry for resolved anchors.
//!
//! [`TextGeometry`] is the seam between the anchoring core and whatever draws
//! the text: a browser DOM, a GPU canvas, or the terminal grid in
//! [`crate::surface::GridSurface`]. The core only asks it for the container
//! text and for one rectangle per visual line of a span.

pub mod position;

use std::borrow::Cow;

use serde::Serialize;

use crate::anchoring::{AnchorOptions, TextAnchor, resolve};
use crate::text::Span;

pub use position::{
    AnchorRects, HighlightRects, calculate_all, get_rects_for_anchor, to_container_relative,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, top-left origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("container is not attached to a visible surface")]
    Disconnected,
    #[error("span {start}..{end} lies outside container of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
    #[error("layout failed: {0}")]
    Layout(String),
}

/// Text-geometry provider for a rendered container.
///
/// Implementations answer in viewport coordinates. Scroll offsets are already
/// applied to every rectangle they return.
pub trait TextGeometry {
    /// False once the container is detached from the visible surface.
    fn is_connected(&self) -> bool;

    /// Current text content of the container.
    fn text(&self) -> Cow<'_, str>;

    /// One rectangle per visual line covered by `span`, top to bottom.
    fn line_rects(&self, span: Span) -> Result<Vec<Rect>, GeometryError>;

    /// Viewport position of the element the overlay is positioned against.
    fn origin(&self) -> Point;

    /// Resolve `anchor` to a span inside this container.
    fn locate(&self, anchor: &TextAnchor, options: &AnchorOptions) -> Option<Span> {
        if !self.is_connected() {
            return None;
        }
        let text = self.text();
        resolve(&text, anchor, options).filter(|span| span.fits(&text))
    }
}
