pub mod anchoring;
pub mod editor;
pub mod geometry;
pub mod io;
pub mod markup;
pub mod overlay;
pub mod surface;
pub mod text;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use anchoring::{AnchorOptions, DEFAULT_CONTEXT_CHARS, MatchMode, TextAnchor};
pub use editor::{Editor, EditorConfig, EditorError, Highlight, HighlightPatch, HighlightState};
pub use geometry::{GeometryError, HighlightRects, Point, Rect, TextGeometry};
pub use io::*;
pub use overlay::{OverlayEvent, OverlayManager, OverlayStyle, Rgba};
pub use surface::{EditableSurface, GridSurface, SelectionState, SurfaceEvent};
pub use text::Span;
