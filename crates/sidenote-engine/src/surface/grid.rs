use std::borrow::Cow;

use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::geometry::{GeometryError, Point, Rect, TextGeometry};
use crate::surface::layout::{cell_of, offset_of};
use crate::surface::{EditableSurface, SelectionState, SurfaceEvent, VisualLine, wrap_lines};
use crate::text::Span;

/// Size of one character cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub cell_width: f32,
    pub line_height: f32,
}

impl CellMetrics {
    /// One unit per cell, for terminals where the grid is the coordinate space.
    pub fn terminal() -> Self {
        Self {
            cell_width: 1.0,
            line_height: 1.0,
        }
    }

    fn is_usable(&self) -> bool {
        self.cell_width > 0.0 && self.line_height > 0.0
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            cell_width: 8.0,
            line_height: 16.0,
        }
    }
}

/// Visible window of the container, in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(origin: Point, width: f32, height: f32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }
}

/// Editable monospace surface.
///
/// Text lives in an xi-rope buffer and is laid out on a fixed character grid
/// that soft-wraps at the viewport width. This is the geometry provider used
/// by terminal hosts and by tests; browser hosts supply their own.
#[derive(Debug, Clone)]
pub struct GridSurface {
    buffer: Rope,
    selection: SelectionState,
    metrics: CellMetrics,
    viewport: Viewport,
    /// Scroll offset in viewport units
    scroll: Point,
    connected: bool,
    notifications: Vec<SurfaceEvent>,
}

impl GridSurface {
    pub fn new(viewport: Viewport, metrics: CellMetrics) -> Self {
        Self {
            buffer: Rope::from(""),
            selection: SelectionState::None,
            metrics,
            viewport,
            scroll: Point::default(),
            connected: true,
            notifications: Vec::new(),
        }
    }

    /// Create a surface holding `bytes`, which must be valid UTF-8.
    pub fn from_bytes(
        bytes: &[u8],
        viewport: Viewport,
        metrics: CellMetrics,
    ) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let mut surface = Self::new(viewport, metrics);
        surface.buffer = Rope::from(text);
        Ok(surface)
    }

    /// Characters that fit on one row.
    pub fn columns(&self) -> usize {
        if !self.metrics.is_usable() {
            return 1;
        }
        ((self.viewport.width / self.metrics.cell_width).floor() as usize).max(1)
    }

    /// Rows that fit in the viewport.
    pub fn visible_rows(&self) -> usize {
        if !self.metrics.is_usable() {
            return 0;
        }
        (self.viewport.height / self.metrics.line_height).floor() as usize
    }

    pub fn visual_lines(&self) -> Vec<VisualLine> {
        wrap_lines(&self.text(), self.columns())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    pub fn scroll(&self) -> Point {
        self.scroll
    }

    /// Scroll to an absolute offset; negative offsets clamp to zero.
    pub fn scroll_to(&mut self, scroll: Point) {
        let scroll = Point::new(scroll.x.max(0.0), scroll.y.max(0.0));
        if scroll != self.scroll {
            self.scroll = scroll;
            self.notifications.push(SurfaceEvent::Scroll);
        }
    }

    /// Scroll by whole rows.
    pub fn scroll_rows(&mut self, rows: isize) {
        let dy = rows as f32 * self.metrics.line_height;
        self.scroll_to(Point::new(self.scroll.x, self.scroll.y + dy));
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if width != self.viewport.width || height != self.viewport.height {
            self.viewport.width = width;
            self.viewport.height = height;
            self.notifications.push(SurfaceEvent::Resize);
        }
    }

    pub fn move_to(&mut self, origin: Point) {
        if origin != self.viewport.origin {
            self.viewport.origin = origin;
            self.notifications.push(SurfaceEvent::Resize);
        }
    }

    /// Swap glyph metrics, as happens once fonts finish loading.
    pub fn set_metrics(&mut self, metrics: CellMetrics) {
        if metrics != self.metrics {
            self.metrics = metrics;
            self.notifications.push(SurfaceEvent::FontsLoaded);
        }
    }

    /// Detach from the visible surface; geometry queries fail until reattached.
    pub fn detach(&mut self) {
        if self.connected {
            self.connected = false;
            self.notifications.push(SurfaceEvent::Resize);
        }
    }

    pub fn attach(&mut self) {
        if !self.connected {
            self.connected = true;
            self.notifications.push(SurfaceEvent::Resize);
        }
    }

    /// Column and row of a byte offset, ignoring scroll.
    pub fn cell_for_offset(&self, offset: usize) -> (usize, usize) {
        let text = self.text();
        cell_of(&text, &wrap_lines(&text, self.columns()), offset)
    }

    /// Byte offset at a column and row, ignoring scroll.
    pub fn offset_for_cell(&self, column: usize, row: usize) -> usize {
        let text = self.text();
        offset_of(&text, &wrap_lines(&text, self.columns()), column, row)
    }

    fn clamp_span(&self, span: Span) -> Span {
        let text = self.text();
        let mut start = span.start.min(text.len());
        let mut end = span.end.min(text.len()).max(start);
        while !text.is_char_boundary(start) {
            start -= 1;
        }
        while !text.is_char_boundary(end) {
            end += 1;
        }
        Span::new(start, end)
    }
}

impl TextGeometry for GridSurface {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn text(&self) -> Cow<'_, str> {
        self.buffer.slice_to_cow(0..self.buffer.len())
    }

    fn line_rects(&self, span: Span) -> Result<Vec<Rect>, GeometryError> {
        if !self.connected {
            return Err(GeometryError::Disconnected);
        }
        if !self.metrics.is_usable() {
            return Err(GeometryError::Layout(format!(
                "unusable cell metrics {:?}",
                self.metrics
            )));
        }

        let text = self.text();
        if span.start > span.end || span.end > text.len() {
            return Err(GeometryError::OutOfBounds {
                start: span.start,
                end: span.end,
                len: text.len(),
            });
        }
        for offset in [span.start, span.end] {
            if !text.is_char_boundary(offset) {
                return Err(GeometryError::NotCharBoundary(offset));
            }
        }

        let CellMetrics {
            cell_width,
            line_height,
        } = self.metrics;
        let origin = self.viewport.origin;

        let rects = wrap_lines(&text, self.columns())
            .into_iter()
            .filter_map(|line| {
                let covered = line.span.intersect(span)?;
                let column = text[line.span.start..covered.start].chars().count();
                let width = text[covered.start..covered.end].chars().count();
                Some(Rect::new(
                    origin.x + column as f32 * cell_width - self.scroll.x,
                    origin.y + line.row as f32 * line_height - self.scroll.y,
                    width as f32 * cell_width,
                    line_height,
                ))
            })
            .collect();

        Ok(rects)
    }

    fn origin(&self) -> Point {
        self.viewport.origin
    }
}

impl EditableSurface for GridSurface {
    fn content(&self) -> String {
        self.buffer.to_string()
    }

    fn set_content(&mut self, content: &str) {
        self.buffer = Rope::from(content);
        self.selection = SelectionState::None;
        self.notifications.push(SurfaceEvent::Input);
    }

    fn selection(&self) -> SelectionState {
        self.selection
    }

    fn set_selection(&mut self, selection: SelectionState) {
        if selection != self.selection {
            self.selection = selection;
            self.notifications.push(SurfaceEvent::SelectionChange);
        }
    }

    fn replace(&mut self, span: Span, text: &str) -> Span {
        let span = self.clamp_span(span);

        let mut builder = Builder::new(self.buffer.len());
        builder.replace(span.start..span.end, Rope::from(text));
        self.buffer = builder.build().apply(&self.buffer);

        let inserted = Span::new(span.start, span.start + text.len());
        self.selection = SelectionState::Range(Span::caret(inserted.end));
        self.notifications.push(SurfaceEvent::Input);
        self.notifications.push(SurfaceEvent::SelectionChange);
        inserted
    }

    fn take_notifications(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn surface(text: &str, columns: usize) -> GridSurface {
        let viewport = Viewport::new(Point::new(0.0, 0.0), columns as f32 * 8.0, 160.0);
        GridSurface::from_bytes(text.as_bytes(), viewport, CellMetrics::default()).unwrap()
    }

    fn span_of(text: &str, needle: &str) -> Span {
        let start = text.find(needle).unwrap();
        Span::new(start, start + needle.len())
    }

    #[test]
    fn from_bytes_rejects_invalid_utf8() {
        let viewport = Viewport::new(Point::default(), 80.0, 80.0);
        assert!(GridSurface::from_bytes(&[0xff, 0xfe], viewport, CellMetrics::default()).is_err());
    }

    #[test]
    fn single_line_span_has_one_rect() {
        let text = "The quick brown fox jumps.";
        let surface = surface(text, 80);

        let rects = surface.line_rects(span_of(text, "brown fox")).unwrap();
        assert_eq!(rects, vec![Rect::new(80.0, 0.0, 72.0, 16.0)]);
    }

    #[test]
    fn wrapped_span_has_one_rect_per_row() {
        let text = "aaaa bbbb cccc";
        let surface = surface(text, 5);

        let rects = surface.line_rects(span_of(text, "bbbb cccc")).unwrap();
        assert_eq!(
            rects,
            vec![
                Rect::new(0.0, 16.0, 40.0, 16.0),
                Rect::new(0.0, 32.0, 32.0, 16.0),
            ]
        );
    }

    #[test]
    fn scroll_is_baked_into_rects() {
        let text = "line one\nline two";
        let mut surface = surface(text, 80);
        surface.scroll_to(Point::new(0.0, 16.0));

        let rects = surface.line_rects(span_of(text, "two")).unwrap();
        assert_eq!(rects, vec![Rect::new(40.0, 0.0, 24.0, 16.0)]);
    }

    #[test]
    fn disconnected_surface_refuses_geometry() {
        let mut surface = surface("text", 80);
        surface.detach();
        assert_eq!(
            surface.line_rects(Span::new(0, 4)),
            Err(GeometryError::Disconnected)
        );
    }

    #[test]
    fn connection_changes_notify_once() {
        let mut surface = surface("text", 80);
        surface.detach();
        surface.detach();
        assert_eq!(surface.take_notifications(), vec![SurfaceEvent::Resize]);

        surface.attach();
        surface.attach();
        assert_eq!(surface.take_notifications(), vec![SurfaceEvent::Resize]);
        assert_eq!(surface.line_rects(Span::new(0, 4)).map(|r| r.len()), Ok(1));
    }

    #[test]
    fn out_of_bounds_span_is_an_error() {
        let surface = surface("text", 80);
        assert!(matches!(
            surface.line_rects(Span::new(2, 9)),
            Err(GeometryError::OutOfBounds { len: 4, .. })
        ));
    }

    #[test]
    fn split_character_is_an_error() {
        let surface = surface("café", 80);
        assert_eq!(
            surface.line_rects(Span::new(0, 4)),
            Err(GeometryError::NotCharBoundary(4))
        );
    }

    #[test]
    fn zero_metrics_is_a_layout_error() {
        let mut surface = surface("text", 80);
        surface.set_metrics(CellMetrics {
            cell_width: 0.0,
            line_height: 16.0,
        });
        assert!(matches!(
            surface.line_rects(Span::new(0, 4)),
            Err(GeometryError::Layout(_))
        ));
    }

    #[test]
    fn replace_moves_caret_and_notifies() {
        let mut surface = surface("hello world", 80);
        let inserted = surface.replace(Span::new(6, 11), "there");

        assert_eq!(surface.content(), "hello there");
        assert_eq!(inserted, Span::new(6, 11));
        assert_eq!(surface.selection(), SelectionState::Range(Span::caret(11)));
        assert_eq!(
            surface.take_notifications(),
            vec![SurfaceEvent::Input, SurfaceEvent::SelectionChange]
        );
        assert!(surface.take_notifications().is_empty());
    }

    #[test]
    fn replace_clamps_stale_spans() {
        let mut surface = surface("abc", 80);
        surface.replace(Span::new(10, 20), "!");
        assert_eq!(surface.content(), "abc!");
    }

    #[test]
    fn layout_changes_notify() {
        let mut surface = surface("abc", 80);
        surface.scroll_rows(1);
        surface.resize(100.0, 100.0);
        surface.set_metrics(CellMetrics {
            cell_width: 9.0,
            line_height: 18.0,
        });
        surface.scroll_to(Point::new(0.0, -5.0));

        assert_eq!(
            surface.take_notifications(),
            vec![
                SurfaceEvent::Scroll,
                SurfaceEvent::Resize,
                SurfaceEvent::FontsLoaded,
                SurfaceEvent::Scroll,
            ]
        );
        assert_eq!(surface.scroll(), Point::new(0.0, 0.0));
    }

    #[test]
    fn unchanged_layout_is_silent() {
        let mut surface = surface("abc", 80);
        surface.resize(640.0, 160.0);
        surface.scroll_to(Point::default());
        assert!(surface.take_notifications().is_empty());
    }

    #[test]
    fn cell_and_offset_mapping_follow_wrapping() {
        let surface = surface("abcdef\nxyz", 4);
        assert_eq!(surface.cell_for_offset(5), (1, 1));
        assert_eq!(surface.offset_for_cell(1, 1), 5);
        assert_eq!(surface.cell_for_offset(8), (1, 2));
    }
}
