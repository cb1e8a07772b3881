//! The editable region the editor sits on.
//!
//! The core treats the surface as a black box: it can read and replace text,
//! read and set the native selection, and drain the notifications the surface
//! has observed since the last call. Notifications take the place of input
//! listeners, resize observers and font-loading promises.

pub mod grid;
pub mod layout;

use crate::geometry::TextGeometry;
use crate::text::Span;

pub use grid::{CellMetrics, GridSurface, Viewport};
pub use layout::{VisualLine, wrap_lines};

/// Native selection as reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionState {
    /// Nothing selected and no caret in the surface
    #[default]
    None,
    /// The selection lives somewhere outside this surface
    Foreign,
    /// A range inside the surface; collapsed ranges are a caret
    Range(Span),
}

/// Something the surface observed that the editor must react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Content was mutated
    Input,
    /// The native selection moved
    SelectionChange,
    /// The container scrolled
    Scroll,
    /// The container changed size
    Resize,
    /// Glyph metrics changed after web/terminal fonts settled
    FontsLoaded,
}

impl SurfaceEvent {
    /// Whether highlight geometry may have moved.
    pub fn affects_layout(self) -> bool {
        !matches!(self, SurfaceEvent::SelectionChange)
    }
}

/// A live editable region.
pub trait EditableSurface: TextGeometry {
    /// Full serialized content
    fn content(&self) -> String;

    /// Replace the whole content
    fn set_content(&mut self, content: &str);

    fn selection(&self) -> SelectionState;

    fn set_selection(&mut self, selection: SelectionState);

    /// Replace `span` with `text` and leave the caret after it.
    ///
    /// Returns the span the inserted text now occupies.
    fn replace(&mut self, span: Span, text: &str) -> Span;

    /// Drain everything observed since the previous call, oldest first.
    fn take_notifications(&mut self) -> Vec<SurfaceEvent>;
}
