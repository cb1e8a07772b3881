/*!
 * # Editor Controller
 *
 * [`Editor`] is the façade the rest of the application talks to. It owns:
 *
 * - the editable surface (any [`EditableSurface`]),
 * - the highlight list, the single source of truth for highlights,
 * - the [`OverlayManager`] that paints them,
 * - one ordered [`EventEmitter`] per event type.
 *
 * ## Event Flow
 *
 * Surface notifications and overlay events are pumped after every operation:
 *
 * 1. Layout-affecting notifications schedule a coalesced recalculation
 * 2. Input notifications fire `content_changed` once per pump
 * 3. Overlay clicks fire `highlight_clicked`
 * 4. Overlay drift is optionally applied to the stored highlight (with a
 *    revision entry) and then fires `highlight_updated`
 *
 * Nothing here panics or returns errors for recoverable conditions: capture
 * failures, unresolvable anchors and invalid selections all come back as
 * `None`/`false` and are logged.
 */

pub mod events;
pub mod highlight;

use chrono::Utc;
use uuid::Uuid;

use crate::anchoring::{AnchorOptions, TextAnchor};
use crate::geometry::Point;
use crate::io::NoteRecord;
use crate::markup;
use crate::overlay::{FrameRequester, OverlayEvent, OverlayManager, OverlayStyle};
use crate::surface::{EditableSurface, SelectionState, SurfaceEvent};
use crate::text::Span;

pub use events::{
    ContentChanged, EventEmitter, HighlightClicked, HighlightUpdated, SelectedText,
    SelectionChanged, SubscriptionId,
};
pub use highlight::{AnchorRevision, Highlight, HighlightPatch, HighlightState, Thread};

/// Editor behaviour knobs, usually built from the config file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    pub anchor: AnchorOptions,
    /// Apply drift to stored highlights before notifying listeners
    pub auto_correct_drift: bool,
    pub style: OverlayStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            anchor: AnchorOptions::default(),
            auto_correct_drift: true,
            style: OverlayStyle::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("editable surface is not attached to a visible container")]
    DetachedSurface,
}

pub struct Editor<S: EditableSurface> {
    surface: S,
    overlay: OverlayManager,
    highlights: Vec<Highlight>,
    config: EditorConfig,
    content_changed: EventEmitter<ContentChanged>,
    selection_changed: EventEmitter<SelectionChanged>,
    highlight_clicked: EventEmitter<HighlightClicked>,
    highlight_updated: EventEmitter<HighlightUpdated>,
    destroyed: bool,
}

impl<S: EditableSurface> Editor<S> {
    /// Wrap `surface`; fails fast if the host gave us a detached container.
    pub fn new(
        mut surface: S,
        config: EditorConfig,
        frames: impl FrameRequester + 'static,
    ) -> Result<Self, EditorError> {
        if !surface.is_connected() {
            return Err(EditorError::DetachedSurface);
        }
        // Anything observed before we existed is already reflected in content
        surface.take_notifications();

        Ok(Self {
            surface,
            overlay: OverlayManager::new(config.anchor, config.style, frames),
            highlights: Vec::new(),
            config,
            content_changed: EventEmitter::new(),
            selection_changed: EventEmitter::new(),
            highlight_clicked: EventEmitter::new(),
            highlight_updated: EventEmitter::new(),
            destroyed: false,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutate the surface directly (scroll, resize, host edits), then react
    /// to whatever it observed.
    pub fn edit_surface<R>(&mut self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = f(&mut self.surface);
        self.pump();
        result
    }

    pub fn overlay(&self) -> &OverlayManager {
        &self.overlay
    }

    // ============ Content ============

    pub fn content(&self) -> String {
        self.surface.content()
    }

    pub fn set_content(&mut self, content: &str) {
        if self.destroyed {
            return;
        }
        self.surface.set_content(content);
        self.pump();
    }

    /// Insert at the caret, replacing any selected text.
    ///
    /// Without a usable selection inside the editor the text is appended to
    /// the end instead. Returns the span the text now occupies.
    pub fn insert_at_cursor(&mut self, text: &str) -> Option<Span> {
        if self.destroyed {
            return None;
        }
        let content = self.surface.content();
        let target = match self.surface.selection() {
            SelectionState::Range(span) if span.fits(&content) => span,
            other => {
                log::debug!("no usable caret ({other:?}), appending to end");
                Span::caret(content.len())
            }
        };
        let inserted = self.surface.replace(target, text);
        self.pump();
        Some(inserted)
    }

    /// Render markdown to plain text and insert it at the caret.
    pub fn insert_markdown(&mut self, markdown: &str) -> Option<Span> {
        let text = markup::markdown_to_text(markdown);
        if text.is_empty() {
            return None;
        }
        self.insert_at_cursor(&text)
    }

    // ============ Selection ============

    /// The current selection if it is non-empty and inside the editor.
    pub fn selection(&self) -> Option<SelectedText> {
        let SelectionState::Range(span) = self.surface.selection() else {
            return None;
        };
        if span.is_empty() {
            return None;
        }
        let content = self.surface.content();
        let text = span.slice(&content)?;
        Some(SelectedText {
            text: text.to_string(),
            span,
        })
    }

    /// Capture an anchor for the current selection without storing it.
    pub fn capture_anchor(&self) -> Option<TextAnchor> {
        let selection = self.selection()?;
        TextAnchor::capture(&self.surface.content(), selection.span, &self.config.anchor)
    }

    // ============ Highlights ============

    /// Promote the current selection to a stored, rendered highlight.
    ///
    /// The native selection is cleared afterwards. Returns `None` (and does
    /// nothing) when there is no capturable selection.
    pub fn add_highlight_from_selection(&mut self) -> Option<Highlight> {
        if self.destroyed {
            return None;
        }
        let anchor = self.capture_anchor()?;
        let highlight = Highlight::new(Uuid::new_v4().to_string(), anchor);

        self.store(highlight.clone());
        self.surface.set_selection(SelectionState::None);
        self.pump();
        Some(highlight)
    }

    /// Store a pre-built highlight. Highlights with an empty quote are refused.
    pub fn add_highlight(&mut self, highlight: Highlight) -> bool {
        if self.destroyed {
            return false;
        }
        if highlight.anchor.is_empty() {
            log::warn!("refusing highlight {} with an empty quote", highlight.id);
            return false;
        }
        self.store(highlight);
        self.pump();
        true
    }

    fn store(&mut self, highlight: Highlight) {
        self.overlay
            .add_highlight(&highlight.id, highlight.anchor.clone(), &self.surface);
        match self.highlights.iter_mut().find(|h| h.id == highlight.id) {
            Some(existing) => *existing = highlight,
            None => self.highlights.push(highlight),
        }
    }

    pub fn remove_highlight(&mut self, id: &str) -> Option<Highlight> {
        if self.destroyed {
            return None;
        }
        let index = self.highlights.iter().position(|h| h.id == id)?;
        self.overlay.remove_highlight(id);
        Some(self.highlights.remove(index))
    }

    pub fn highlight(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    /// All highlights in insertion order.
    pub fn highlights(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn all_highlights(&self) -> Vec<Highlight> {
        self.highlights.clone()
    }

    /// Replace every highlight, e.g. with a persisted set.
    ///
    /// Records are kept even if they can no longer resolve; they simply stay
    /// orphaned. Later duplicates of an id win.
    pub fn load_highlights(&mut self, highlights: Vec<Highlight>) {
        if self.destroyed {
            return;
        }
        let mut unique: Vec<Highlight> = Vec::with_capacity(highlights.len());
        for highlight in highlights {
            if highlight.anchor.is_empty() {
                log::warn!("loaded highlight {} has an empty quote", highlight.id);
            }
            unique.retain(|h| h.id != highlight.id);
            unique.push(highlight);
        }

        self.overlay.load_highlights(
            unique.iter().map(|h| (h.id.clone(), h.anchor.clone())),
            &self.surface,
        );
        self.highlights = unique;
        self.pump();
    }

    /// Merge `patch` into a stored highlight.
    ///
    /// Returns false for unknown ids and for an anchor with an empty quote;
    /// a refused patch leaves the highlight untouched.
    pub fn update_highlight(&mut self, id: &str, patch: HighlightPatch) -> bool {
        if self.destroyed {
            return false;
        }
        let Some(highlight) = self.highlights.iter_mut().find(|h| h.id == id) else {
            return false;
        };
        if patch.anchor.as_ref().is_some_and(TextAnchor::is_empty) {
            log::warn!("refusing empty quote for highlight {id}");
            return false;
        }

        if let Some(thread) = patch.thread {
            highlight.thread = thread;
        }
        if let Some(anchor) = patch.anchor
            && highlight.replace_anchor(anchor, Utc::now())
        {
            self.overlay.update_anchor(id, highlight.anchor.clone());
            self.overlay.schedule_recalculation();
        }
        true
    }

    /// State of a stored highlight as of the latest recalculation.
    pub fn highlight_state(&self, id: &str) -> Option<HighlightState> {
        self.highlight(id)?;
        let state = match self.overlay.geometry(id) {
            Some(geometry) if !geometry.is_valid => HighlightState::Orphaned,
            Some(geometry) if geometry.updated_exact.is_some() => HighlightState::Drifted,
            Some(_) => HighlightState::Active,
            None => HighlightState::Orphaned,
        };
        Some(state)
    }

    // ============ Events ============

    pub fn on_content_change(
        &mut self,
        handler: impl FnMut(&ContentChanged) + 'static,
    ) -> SubscriptionId {
        self.content_changed.subscribe(handler)
    }

    pub fn on_selection_change(
        &mut self,
        handler: impl FnMut(&SelectionChanged) + 'static,
    ) -> SubscriptionId {
        self.selection_changed.subscribe(handler)
    }

    pub fn on_highlight_click(
        &mut self,
        handler: impl FnMut(&HighlightClicked) + 'static,
    ) -> SubscriptionId {
        self.highlight_clicked.subscribe(handler)
    }

    pub fn on_highlight_updated(
        &mut self,
        handler: impl FnMut(&HighlightUpdated) + 'static,
    ) -> SubscriptionId {
        self.highlight_updated.subscribe(handler)
    }

    /// Remove a handler registered with any `on_*` method.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.content_changed.unsubscribe(id)
            | self.selection_changed.unsubscribe(id)
            | self.highlight_clicked.unsubscribe(id)
            | self.highlight_updated.unsubscribe(id)
    }

    // ============ Host integration ============

    /// Feed an observation from a host that reports events itself.
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        if self.destroyed {
            return;
        }
        self.dispatch_surface_events(&[event]);
        self.pump();
    }

    /// Frame callback. Runs the pending recalculation, if any.
    pub fn on_animation_frame(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        let ran = self.overlay.run_frame(&self.surface);
        self.pump();
        ran
    }

    /// Refresh every highlight right now, e.g. after bulk content replacement.
    pub fn recalculate_highlights(&mut self) {
        if self.destroyed {
            return;
        }
        self.pump();
        self.overlay.recalculate_all(&self.surface);
        self.pump();
    }

    /// Click at a viewport point. Returns the highlight hit, if any.
    pub fn click_at(&mut self, point: Point) -> Option<String> {
        if self.destroyed {
            return None;
        }
        let id = self.overlay.click_at(self.relative(point));
        self.pump();
        id
    }

    /// Pointer moved to a viewport point, or left (`None`).
    pub fn hover_at(&mut self, point: Option<Point>) -> bool {
        if self.destroyed {
            return false;
        }
        let relative = point.map(|p| self.relative(p));
        self.overlay.hover_at(relative)
    }

    fn relative(&self, point: Point) -> Point {
        let origin = self.surface.origin();
        Point::new(point.x - origin.x, point.y - origin.y)
    }

    /// Snapshot for the persistence collaborator.
    pub fn to_record(&self, version: u64) -> NoteRecord {
        NoteRecord {
            content: self.content(),
            highlights: self.all_highlights(),
            version,
        }
    }

    /// Restore content and highlights from a persisted record.
    pub fn load_record(&mut self, record: NoteRecord) {
        if self.destroyed {
            return;
        }
        self.surface.set_content(&record.content);
        self.pump();
        self.load_highlights(record.highlights);
        self.recalculate_highlights();
    }

    /// Content as HTML with resolved highlights wrapped in `<mark>`.
    pub fn export_html(&self) -> String {
        let content = self.content();
        let spans: Vec<_> = self
            .highlights
            .iter()
            .filter_map(|h| {
                let span = self.surface.locate(&h.anchor, &self.config.anchor)?;
                Some((h.id.as_str(), span))
            })
            .collect();
        markup::render_html(&content, &spans)
    }

    /// Release overlay state and handlers. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.overlay.clear();
        self.content_changed.clear();
        self.selection_changed.clear();
        self.highlight_clicked.clear();
        self.highlight_updated.clear();
        log::debug!("editor destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ============ Event pump ============

    fn pump(&mut self) {
        let notifications = self.surface.take_notifications();
        self.dispatch_surface_events(&notifications);

        for event in self.overlay.take_events() {
            match event {
                OverlayEvent::HighlightClicked { highlight_id } => {
                    self.highlight_clicked
                        .emit(&HighlightClicked { highlight_id });
                }
                OverlayEvent::HighlightUpdated {
                    highlight_id,
                    new_exact,
                } => {
                    if self.config.auto_correct_drift {
                        self.correct_drift(&highlight_id, &new_exact);
                    }
                    self.highlight_updated.emit(&HighlightUpdated {
                        highlight_id,
                        new_exact,
                    });
                }
            }
        }
    }

    fn dispatch_surface_events(&mut self, events: &[SurfaceEvent]) {
        if events.iter().any(|e| e.affects_layout()) {
            self.overlay.schedule_recalculation();
        }
        if events.contains(&SurfaceEvent::Input) {
            let content = self.surface.content();
            self.content_changed.emit(&ContentChanged { content });
        }
        if events.contains(&SurfaceEvent::SelectionChange) {
            let selection = self.selection();
            self.selection_changed.emit(&SelectionChanged { selection });
        }
    }

    /// Accept drift for `id`, recapturing context around the text now found.
    fn correct_drift(&mut self, id: &str, new_exact: &str) {
        let Some(highlight) = self.highlights.iter_mut().find(|h| h.id == id) else {
            return;
        };
        let options = &self.config.anchor;
        let recaptured = self
            .surface
            .locate(&highlight.anchor, options)
            .and_then(|span| TextAnchor::capture(&self.surface.text(), span, options))
            .filter(|anchor| anchor.exact == new_exact);

        let now = Utc::now();
        let changed = match recaptured {
            Some(anchor) => highlight.replace_anchor(anchor, now),
            None => highlight.replace_exact(new_exact, now),
        };
        if changed {
            log::debug!("highlight {id} quote corrected to {new_exact:?}");
            self.overlay.update_anchor(id, highlight.anchor.clone());
        }
    }
}

impl<S: EditableSurface> Drop for Editor<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<S: EditableSurface + std::fmt::Debug> std::fmt::Debug for Editor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("surface", &self.surface)
            .field("highlights", &self.highlights.len())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::GridSurface;
    use crate::tests::{CountingFrames, grid};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn editor(text: &str) -> Editor<GridSurface> {
        editor_with(text, EditorConfig::default())
    }

    fn editor_with(text: &str, config: EditorConfig) -> Editor<GridSurface> {
        let frames = CountingFrames::default();
        Editor::new(grid(text, 80), config, frames.requester()).unwrap()
    }

    fn select(editor: &mut Editor<GridSurface>, needle: &str) -> Span {
        let content = editor.content();
        let start = content.find(needle).unwrap();
        let span = Span::new(start, start + needle.len());
        editor.edit_surface(|s| s.set_selection(SelectionState::Range(span)));
        span
    }

    fn recorder<E: Clone + 'static>() -> (Rc<RefCell<Vec<E>>>, impl FnMut(&E) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |event: &E| sink.borrow_mut().push(event.clone()))
    }

    #[test]
    fn detached_surface_is_rejected() {
        let mut surface = grid("text", 80);
        surface.detach();
        let result = Editor::new(surface, EditorConfig::default(), || {});
        assert!(matches!(result, Err(EditorError::DetachedSurface)));
    }

    #[test]
    fn highlight_from_selection_stores_and_renders() {
        let mut editor = editor("The quick brown fox jumps over the lazy dog.");
        select(&mut editor, "brown fox");

        let highlight = editor.add_highlight_from_selection().unwrap();

        assert_eq!(highlight.anchor.exact, "brown fox");
        assert_eq!(highlight.anchor.prefix, "The quick ");
        assert_eq!(highlight.anchor.suffix, " jumps over the lazy dog.");
        assert_eq!(editor.highlights().len(), 1);
        assert_eq!(editor.selection(), None);
        assert_eq!(editor.overlay().elements().count(), 1);
        assert_eq!(editor.highlight_state(&highlight.id), Some(HighlightState::Active));
    }

    #[test]
    fn collapsed_or_missing_selection_creates_nothing() {
        let mut editor = editor("some text");
        assert!(editor.add_highlight_from_selection().is_none());

        editor.edit_surface(|s| s.set_selection(SelectionState::Range(Span::caret(2))));
        assert!(editor.add_highlight_from_selection().is_none());

        editor.edit_surface(|s| s.set_selection(SelectionState::Foreign));
        assert!(editor.add_highlight_from_selection().is_none());
        assert!(editor.highlights().is_empty());
    }

    #[test]
    fn insert_without_caret_appends() {
        let mut editor = editor("hello");
        let span = editor.insert_at_cursor(" world").unwrap();
        assert_eq!(editor.content(), "hello world");
        assert_eq!(span, Span::new(5, 11));
    }

    #[test]
    fn insert_replaces_selection() {
        let mut editor = editor("hello there world");
        select(&mut editor, "there");
        editor.insert_at_cursor("big").unwrap();
        assert_eq!(editor.content(), "hello big world");
    }

    #[test]
    fn insert_markdown_renders_to_text() {
        let mut editor = editor("");
        editor.insert_markdown("# Title\n\nSome *emphasis*.").unwrap();
        assert_eq!(editor.content(), "Title\n\nSome emphasis.");
    }

    #[test]
    fn every_subscriber_is_notified_in_order() {
        let mut editor = editor("abc");
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second"] {
            let order = order.clone();
            editor.on_content_change(move |_| order.borrow_mut().push(name));
        }

        editor.insert_at_cursor("d");

        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn input_is_coalesced_per_operation() {
        let mut editor = editor("abc");
        let (seen, handler) = recorder::<ContentChanged>();
        editor.on_content_change(handler);

        editor.edit_surface(|s| {
            s.replace(Span::caret(0), "1");
            s.replace(Span::caret(0), "2");
        });

        assert_eq!(
            *seen.borrow(),
            vec![ContentChanged {
                content: "21abc".to_string()
            }]
        );
    }

    #[test]
    fn unsubscribed_handler_stops_receiving() {
        let mut editor = editor("abc");
        let (seen, handler) = recorder::<ContentChanged>();
        let id = editor.on_content_change(handler);

        assert!(editor.unsubscribe(id));
        assert!(!editor.unsubscribe(id));
        editor.insert_at_cursor("d");

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn selection_changes_are_reported() {
        let mut editor = editor("pick a word");
        let (seen, handler) = recorder::<SelectionChanged>();
        editor.on_selection_change(handler);

        let span = select(&mut editor, "word");

        assert_eq!(
            *seen.borrow(),
            vec![SelectionChanged {
                selection: Some(SelectedText {
                    text: "word".to_string(),
                    span
                })
            }]
        );
    }

    #[test]
    fn drift_is_applied_and_reported() {
        let mut editor = editor("quick brown fox jumps");
        let (seen, handler) = recorder::<HighlightUpdated>();
        editor.on_highlight_updated(handler);
        select(&mut editor, "brown fox");
        let id = editor.add_highlight_from_selection().unwrap().id;

        editor.edit_surface(|s| s.replace(Span::new(11, 12), "  "));
        assert!(editor.on_animation_frame());

        let highlight = editor.highlight(&id).unwrap();
        assert_eq!(highlight.anchor.exact, "brown  fox");
        assert_eq!(highlight.revisions.len(), 1);
        assert_eq!(highlight.revisions[0].previous_exact, "brown fox");
        assert_eq!(
            *seen.borrow(),
            vec![HighlightUpdated {
                highlight_id: id.clone(),
                new_exact: "brown  fox".to_string()
            }]
        );
        assert_eq!(editor.highlight_state(&id), Some(HighlightState::Active));
    }

    #[test]
    fn drift_without_auto_correction_leaves_quote() {
        let config = EditorConfig {
            auto_correct_drift: false,
            ..EditorConfig::default()
        };
        let mut editor = editor_with("quick brown fox jumps", config);
        select(&mut editor, "brown fox");
        let id = editor.add_highlight_from_selection().unwrap().id;

        editor.edit_surface(|s| s.replace(Span::new(11, 12), "  "));
        editor.on_animation_frame();

        assert_eq!(editor.highlight(&id).unwrap().anchor.exact, "brown fox");
        assert_eq!(editor.highlight_state(&id), Some(HighlightState::Drifted));
    }

    #[test]
    fn click_reports_highlight() {
        let mut editor = editor("quick brown fox jumps");
        let (seen, handler) = recorder::<HighlightClicked>();
        editor.on_highlight_click(handler);
        select(&mut editor, "brown fox");
        let id = editor.add_highlight_from_selection().unwrap().id;

        assert_eq!(editor.click_at(Point::new(50.0, 4.0)), Some(id.clone()));
        assert_eq!(editor.click_at(Point::new(2.0, 4.0)), None);
        assert_eq!(*seen.borrow(), vec![HighlightClicked { highlight_id: id }]);
    }

    #[test]
    fn deleted_quote_orphans_then_recovers() {
        let mut editor = editor("keep this phrase");
        select(&mut editor, "this");
        let id = editor.add_highlight_from_selection().unwrap().id;

        editor.set_content("keep phrase");
        editor.recalculate_highlights();
        assert_eq!(editor.highlight_state(&id), Some(HighlightState::Orphaned));
        assert!(editor.highlight(&id).is_some());

        editor.set_content("keep this phrase");
        editor.recalculate_highlights();
        assert_eq!(editor.highlight_state(&id), Some(HighlightState::Active));
    }

    #[test]
    fn empty_quote_is_refused_on_add_but_kept_on_load() {
        let mut editor = editor("text");
        let empty = Highlight::new("e", TextAnchor::new("", "", ""));

        assert!(!editor.add_highlight(empty.clone()));
        editor.load_highlights(vec![empty]);

        assert_eq!(editor.highlights().len(), 1);
        assert_eq!(editor.highlight_state("e"), Some(HighlightState::Orphaned));
    }

    #[test]
    fn load_keeps_last_duplicate() {
        let mut editor = editor("alpha beta");
        editor.load_highlights(vec![
            Highlight::new("x", TextAnchor::new("alpha", "", "")),
            Highlight::new("x", TextAnchor::new("beta", "", "")),
        ]);

        assert_eq!(editor.highlights().len(), 1);
        assert_eq!(editor.highlight("x").unwrap().anchor.exact, "beta");
        assert_eq!(editor.overlay().len(), 1);
    }

    #[test]
    fn update_patches_thread_and_anchor() {
        let mut editor = editor("alpha beta");
        editor.add_highlight(Highlight::new("h", TextAnchor::new("alpha", "", " beta")));
        let thread = Thread {
            id: "t".to_string(),
            messages: vec![serde_json::json!({"body": "hi"})],
            collapsed: false,
            created_at: Utc::now(),
        };

        assert!(editor.update_highlight("h", HighlightPatch::thread(thread.clone())));
        assert!(editor.update_highlight("h", HighlightPatch::anchor(TextAnchor::new("beta", "alpha ", ""))));
        assert!(!editor.update_highlight("missing", HighlightPatch::detach_thread()));

        let highlight = editor.highlight("h").unwrap();
        assert_eq!(highlight.thread.as_ref(), Some(&thread));
        assert_eq!(highlight.anchor.exact, "beta");
        assert!(editor.overlay().is_recalculation_pending());
    }

    #[test]
    fn update_refuses_empty_quote() {
        let mut editor = editor("alpha beta");
        editor.add_highlight(Highlight::new("h", TextAnchor::new("alpha", "", " beta")));
        let mut patch = HighlightPatch::anchor(TextAnchor::new("", "", ""));
        patch.thread = Some(None);

        assert!(!editor.update_highlight("h", patch));

        let highlight = editor.highlight("h").unwrap();
        assert_eq!(highlight.anchor, TextAnchor::new("alpha", "", " beta"));
        assert!(highlight.revisions.is_empty());
        assert_eq!(editor.overlay().anchor("h").unwrap().exact, "alpha");
    }

    #[test]
    fn insert_appends_for_foreign_or_stale_selection() {
        let mut editor = editor("hello");

        editor.edit_surface(|s| s.set_selection(SelectionState::Foreign));
        assert_eq!(editor.insert_at_cursor("!"), Some(Span::new(5, 6)));

        editor.edit_surface(|s| s.set_selection(SelectionState::Range(Span::new(40, 50))));
        assert_eq!(editor.insert_at_cursor("?"), Some(Span::new(6, 7)));

        assert_eq!(editor.content(), "hello!?");
    }

    #[test]
    fn detached_container_orphans_until_reattached() {
        let mut editor = editor("quick brown fox");
        editor.add_highlight(Highlight::new("h", TextAnchor::new("brown", "quick ", " fox")));

        editor.edit_surface(|s| s.detach());
        assert!(editor.overlay().is_recalculation_pending());
        assert!(editor.on_animation_frame());
        assert_eq!(editor.highlight_state("h"), Some(HighlightState::Orphaned));
        assert_eq!(editor.overlay().elements().count(), 0);

        editor.edit_surface(|s| s.attach());
        assert!(editor.on_animation_frame());
        assert_eq!(editor.highlight_state("h"), Some(HighlightState::Active));
        assert_eq!(editor.overlay().elements().count(), 1);
    }

    #[test]
    fn host_reported_events_schedule_by_kind() {
        let mut editor = editor("abc");

        editor.handle_event(SurfaceEvent::SelectionChange);
        assert!(!editor.overlay().is_recalculation_pending());

        editor.handle_event(SurfaceEvent::FontsLoaded);
        assert!(editor.overlay().is_recalculation_pending());
        assert!(editor.on_animation_frame());
        assert!(!editor.overlay().is_recalculation_pending());
    }

    #[test]
    fn drift_correction_refreshes_context() {
        let mut editor = editor("quick brown fox jumps");
        editor.add_highlight(Highlight::new(
            "h",
            TextAnchor::new("brown fox", "quick ", " jumps"),
        ));

        editor.set_content("so quick brown  fox leaps");
        editor.on_animation_frame();

        let highlight = editor.highlight("h").unwrap();
        assert_eq!(
            highlight.anchor,
            TextAnchor::new("brown  fox", "so quick ", " leaps")
        );
        assert_eq!(highlight.revisions.len(), 1);
        assert_eq!(editor.highlight_state("h"), Some(HighlightState::Active));
    }

    #[test]
    fn remove_returns_the_record() {
        let mut editor = editor("alpha");
        editor.add_highlight(Highlight::new("a", TextAnchor::new("alpha", "", "")));

        assert_eq!(editor.remove_highlight("a").map(|h| h.id), Some("a".to_string()));
        assert!(editor.remove_highlight("a").is_none());
        assert_eq!(editor.overlay().elements().count(), 0);
    }

    #[test]
    fn export_marks_resolved_highlights() {
        let mut editor = editor("a <b> c");
        editor.add_highlight(Highlight::new("h", TextAnchor::new("<b>", "a ", " c")));

        assert_eq!(
            editor.export_html(),
            r#"a <mark data-highlight-id="h">&lt;b&gt;</mark> c"#
        );
    }

    #[test]
    fn record_round_trip_restores_state() {
        let mut source = editor("quick brown fox");
        select(&mut source, "brown");
        source.add_highlight_from_selection().unwrap();
        let record = source.to_record(3);

        let mut restored = editor("");
        restored.load_record(record.clone());

        assert_eq!(restored.content(), "quick brown fox");
        assert_eq!(restored.all_highlights(), record.highlights);
        assert_eq!(restored.overlay().elements().count(), 1);
    }

    #[test]
    fn destroy_is_idempotent_and_silences_handlers() {
        let mut editor = editor("abc");
        let (seen, handler) = recorder::<ContentChanged>();
        editor.on_content_change(handler);
        editor.add_highlight(Highlight::new("a", TextAnchor::new("abc", "", "")));

        editor.destroy();
        editor.destroy();
        editor.set_content("changed");

        assert!(editor.is_destroyed());
        assert!(seen.borrow().is_empty());
        assert!(editor.overlay().is_empty());
        assert_eq!(editor.content(), "abc");
    }
}
