/*!
 * # Overlay Render Manager
 *
 * Highlights are drawn on a separate layer positioned over the editable
 * container, never inside it, so highlight presence cannot disturb the
 * document's structure, undo history or input handling.
 *
 * The manager keeps its own copy of each tracked `(id, anchor)` pair and the
 * rectangles derived from it. It never writes to the editor's highlights:
 * clicks and drift are queued as [`OverlayEvent`]s that the owner drains with
 * [`OverlayManager::take_events`].
 *
 * ## Recalculation
 *
 * - [`OverlayManager::schedule_recalculation`] coalesces any number of
 *   requests into one pass on the next frame.
 * - [`OverlayManager::recalculate_all`] runs a pass immediately.
 * - Every pass discards a highlight's previous elements and builds new ones;
 *   elements are never patched in place.
 */

pub mod element;
pub mod scheduler;

use crate::anchoring::{AnchorOptions, TextAnchor};
use crate::geometry::{HighlightRects, Point, TextGeometry, calculate_all};

pub use element::{OverlayElement, OverlayStyle, PaintedRect, Rgba};
pub use scheduler::{FrameRequester, FrameScheduler};

/// Notifications for the overlay's owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    HighlightClicked {
        highlight_id: String,
    },
    /// The highlight resolved, but to text that differs from its quote
    HighlightUpdated {
        highlight_id: String,
        new_exact: String,
    },
}

#[derive(Debug)]
struct Tracked {
    id: String,
    anchor: TextAnchor,
    elements: Vec<OverlayElement>,
    geometry: Option<HighlightRects>,
    /// Last drift reported upward, so it is only reported once
    reported_drift: Option<String>,
}

#[derive(Debug)]
pub struct OverlayManager {
    tracked: Vec<Tracked>,
    hovered: Option<String>,
    /// Last container-relative pointer position, re-hit-tested after each pass
    pointer: Option<Point>,
    scheduler: FrameScheduler,
    options: AnchorOptions,
    style: OverlayStyle,
    events: Vec<OverlayEvent>,
}

impl OverlayManager {
    pub fn new(
        options: AnchorOptions,
        style: OverlayStyle,
        frames: impl FrameRequester + 'static,
    ) -> Self {
        Self {
            tracked: Vec::new(),
            hovered: None,
            pointer: None,
            scheduler: FrameScheduler::new(frames),
            options,
            style,
            events: Vec::new(),
        }
    }

    /// Track a highlight and render it straight away.
    ///
    /// Re-adding an id replaces its anchor.
    pub fn add_highlight<G>(&mut self, id: &str, anchor: TextAnchor, geometry: &G)
    where
        G: TextGeometry + ?Sized,
    {
        match self.tracked.iter_mut().find(|t| t.id == id) {
            Some(tracked) => {
                tracked.anchor = anchor;
                tracked.reported_drift = None;
            }
            None => self.tracked.push(Tracked {
                id: id.to_string(),
                anchor,
                elements: Vec::new(),
                geometry: None,
                reported_drift: None,
            }),
        }

        let results = match self.tracked.iter().find(|t| t.id == id) {
            Some(tracked) => calculate_all(
                [(tracked.id.as_str(), &tracked.anchor)],
                geometry,
                &self.options,
            ),
            None => Vec::new(),
        };
        self.apply(results);
    }

    /// Stop tracking a highlight and drop its elements.
    pub fn remove_highlight(&mut self, id: &str) -> bool {
        let before = self.tracked.len();
        self.tracked.retain(|t| t.id != id);
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        self.tracked.len() != before
    }

    /// Replace the whole working set, then render it in one pass.
    pub fn load_highlights<I, G>(&mut self, highlights: I, geometry: &G)
    where
        I: IntoIterator<Item = (String, TextAnchor)>,
        G: TextGeometry + ?Sized,
    {
        self.tracked.clear();
        self.hovered = None;
        for (id, anchor) in highlights {
            self.tracked.retain(|t| t.id != id);
            self.tracked.push(Tracked {
                id,
                anchor,
                elements: Vec::new(),
                geometry: None,
                reported_drift: None,
            });
        }
        self.recalculate_all(geometry);
    }

    /// Swap the anchor of a tracked highlight without re-rendering.
    ///
    /// Used once the owner has accepted a drift correction; the next pass
    /// renders from the new anchor.
    pub fn update_anchor(&mut self, id: &str, anchor: TextAnchor) -> bool {
        let Some(tracked) = self.tracked.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        if let Some(geometry) = tracked.geometry.as_mut()
            && geometry.updated_exact.as_deref() == Some(anchor.exact.as_str())
        {
            geometry.updated_exact = None;
            tracked.reported_drift = None;
        }
        tracked.anchor = anchor;
        true
    }

    /// Request a recalculation on the next frame.
    ///
    /// Returns true if a new frame was requested, false if one was pending.
    pub fn schedule_recalculation(&mut self) -> bool {
        let requested = self.scheduler.schedule();
        if !requested {
            log::trace!("recalculation already pending");
        }
        requested
    }

    pub fn is_recalculation_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Frame callback: run the pending pass, if any.
    pub fn run_frame<G>(&mut self, geometry: &G) -> bool
    where
        G: TextGeometry + ?Sized,
    {
        if !self.scheduler.take() {
            return false;
        }
        self.recalculate_all(geometry);
        true
    }

    /// Recompute and repaint every tracked highlight now.
    ///
    /// Reads the container, never writes it.
    pub fn recalculate_all<G>(&mut self, geometry: &G)
    where
        G: TextGeometry + ?Sized,
    {
        // A pending frame would only repeat this pass
        self.scheduler.take();

        let results = calculate_all(
            self.tracked.iter().map(|t| (t.id.as_str(), &t.anchor)),
            geometry,
            &self.options,
        );
        log::trace!("recalculated {} highlights", results.len());
        self.apply(results);
    }

    fn apply(&mut self, results: Vec<HighlightRects>) {
        for result in results {
            let Some(tracked) = self.tracked.iter_mut().find(|t| t.id == result.id) else {
                continue;
            };

            tracked.elements = result
                .rects
                .iter()
                .enumerate()
                .map(|(line, rect)| OverlayElement {
                    highlight_id: result.id.clone(),
                    line,
                    rect: *rect,
                })
                .collect();

            match &result.updated_exact {
                Some(new_exact) if tracked.reported_drift.as_ref() != Some(new_exact) => {
                    tracked.reported_drift = Some(new_exact.clone());
                    self.events.push(OverlayEvent::HighlightUpdated {
                        highlight_id: result.id.clone(),
                        new_exact: new_exact.clone(),
                    });
                }
                Some(_) => {}
                None => tracked.reported_drift = None,
            }

            tracked.geometry = Some(result);
        }

        // Highlights may have reflowed out from under a resting pointer
        let hovered = self.pointer.and_then(|p| self.hit_test(p)).map(str::to_string);
        if hovered != self.hovered {
            log::trace!("hover moved to {hovered:?} after recalculation");
            self.hovered = hovered;
        }
    }

    /// Topmost highlight under a container-relative point.
    pub fn hit_test(&self, point: Point) -> Option<&str> {
        self.tracked
            .iter()
            .rev()
            .find(|t| t.elements.iter().any(|e| e.rect.contains(point)))
            .map(|t| t.id.as_str())
    }

    /// Handle a click at a container-relative point.
    ///
    /// Queues a [`OverlayEvent::HighlightClicked`] when a highlight was hit.
    pub fn click_at(&mut self, point: Point) -> Option<String> {
        let id = self.hit_test(point)?.to_string();
        self.events.push(OverlayEvent::HighlightClicked {
            highlight_id: id.clone(),
        });
        Some(id)
    }

    /// Move the pointer; `None` means it left the container.
    ///
    /// Only changes emphasis. Returns true if the hovered highlight changed.
    pub fn hover_at(&mut self, point: Option<Point>) -> bool {
        self.pointer = point;
        let hovered = point.and_then(|p| self.hit_test(p)).map(str::to_string);
        if hovered == self.hovered {
            return false;
        }
        self.hovered = hovered;
        true
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// All elements in paint order.
    pub fn elements(&self) -> impl Iterator<Item = &OverlayElement> {
        self.tracked.iter().flat_map(|t| t.elements.iter())
    }

    /// Elements with their current fill, in paint order.
    pub fn painted(&self) -> impl Iterator<Item = PaintedRect<'_>> {
        self.tracked.iter().flat_map(move |t| {
            let hovered = self.hovered.as_deref() == Some(t.id.as_str());
            let fill = if hovered {
                self.style.hover_fill
            } else {
                self.style.fill
            };
            t.elements.iter().map(move |element| PaintedRect {
                element,
                fill,
                hovered,
            })
        })
    }

    /// Result of the latest pass for `id`.
    pub fn geometry(&self, id: &str) -> Option<&HighlightRects> {
        self.tracked
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.geometry.as_ref())
    }

    pub fn anchor(&self, id: &str) -> Option<&TextAnchor> {
        self.tracked.iter().find(|t| t.id == id).map(|t| &t.anchor)
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn style(&self) -> OverlayStyle {
        self.style
    }

    /// Drain queued events, oldest first.
    pub fn take_events(&mut self) -> Vec<OverlayEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop every tracked highlight, element and queued event.
    pub fn clear(&mut self) {
        self.tracked.clear();
        self.hovered = None;
        self.events.clear();
        self.scheduler.take();
    }
}
