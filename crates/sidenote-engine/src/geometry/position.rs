use serde::Serialize;

use crate::anchoring::{AnchorOptions, TextAnchor, matching_view, resolve_in};
use crate::geometry::{GeometryError, Point, Rect, TextGeometry};
use crate::text::{RenderedText, Span};

/// Geometry of a single anchor in viewport coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorRects {
    /// Literal span the anchor resolved to
    pub span: Option<Span>,
    /// One rectangle per visual line
    pub rects: Vec<Rect>,
    /// Text currently at `span`; `None` when the anchor did not resolve
    pub found_text: Option<String>,
}

/// Result of one highlight in a recalculation pass.
///
/// Never persisted; rebuilt on every pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRects {
    pub id: String,
    /// Container-relative rectangles, empty when invalid
    pub rects: Vec<Rect>,
    pub is_valid: bool,
    /// Found text, present only when it differs from the stored quote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_exact: Option<String>,
}

impl HighlightRects {
    fn invalid(id: &str) -> Self {
        Self {
            id: id.to_string(),
            rects: Vec::new(),
            is_valid: false,
            updated_exact: None,
        }
    }
}

/// Resolve `anchor` and measure it, in viewport coordinates.
///
/// Failures are logged and come back as empty rects with no found text.
pub fn get_rects_for_anchor<G>(
    anchor: &TextAnchor,
    geometry: &G,
    options: &AnchorOptions,
) -> AnchorRects
where
    G: TextGeometry + ?Sized,
{
    if !geometry.is_connected() {
        log::debug!("skipping anchor {:?}: container disconnected", anchor.exact);
        return AnchorRects::default();
    }

    let text = geometry.text();
    let view = matching_view(&text, options.match_mode);
    match measure(&text, &view, anchor, geometry, options) {
        Ok(rects) => rects,
        Err(e) => {
            log::warn!("failed to measure anchor {:?}: {e}", anchor.exact);
            AnchorRects::default()
        }
    }
}

/// Re-base viewport rectangles onto the overlay's positioning ancestor.
///
/// Only the origin is subtracted. Providers already apply scroll, and the
/// overlay is fixed over the container, so scroll must not be added here.
pub fn to_container_relative(rects: &[Rect], origin: Point) -> Vec<Rect> {
    rects
        .iter()
        .map(|rect| rect.translate(-origin.x, -origin.y))
        .collect()
}

/// One recalculation pass over `highlights`.
///
/// The container text is read once, so every highlight in the pass is
/// resolved against the same snapshot. A failing highlight is reported as
/// invalid and the rest of the batch carries on.
pub fn calculate_all<'a, G, I>(
    highlights: I,
    geometry: &G,
    options: &AnchorOptions,
) -> Vec<HighlightRects>
where
    G: TextGeometry + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a TextAnchor)>,
{
    let connected = geometry.is_connected();
    let text = geometry.text();
    let view = matching_view(&text, options.match_mode);
    let origin = geometry.origin();

    highlights
        .into_iter()
        .map(|(id, anchor)| {
            if !connected {
                log::debug!("highlight {id} skipped: container disconnected");
                return HighlightRects::invalid(id);
            }

            match measure(&text, &view, anchor, geometry, options) {
                Ok(AnchorRects {
                    span: Some(_),
                    rects,
                    found_text,
                }) => {
                    let updated_exact = found_text.filter(|found| *found != anchor.exact);
                    if let Some(found) = &updated_exact {
                        log::debug!("highlight {id} drifted: {:?} -> {found:?}", anchor.exact);
                    }
                    HighlightRects {
                        id: id.to_string(),
                        rects: to_container_relative(&rects, origin),
                        is_valid: true,
                        updated_exact,
                    }
                }
                Ok(_) => {
                    log::debug!("highlight {id} orphaned: {:?} not found", anchor.exact);
                    HighlightRects::invalid(id)
                }
                Err(e) => {
                    log::warn!("highlight {id} could not be positioned: {e}");
                    HighlightRects::invalid(id)
                }
            }
        })
        .collect()
}

fn measure<G>(
    text: &str,
    view: &RenderedText,
    anchor: &TextAnchor,
    geometry: &G,
    options: &AnchorOptions,
) -> Result<AnchorRects, GeometryError>
where
    G: TextGeometry + ?Sized,
{
    let Some(resolution) = resolve_in(view, anchor, options) else {
        return Ok(AnchorRects::default());
    };
    let span = resolution.span;
    let found = span.slice(text).ok_or(GeometryError::OutOfBounds {
        start: span.start,
        end: span.end,
        len: text.len(),
    })?;

    let rects = geometry
        .line_rects(span)?
        .into_iter()
        .filter(|rect| !rect.is_empty())
        .collect();

    Ok(AnchorRects {
        span: Some(span),
        rects,
        found_text: Some(found.to_string()),
    })
}
