/*!
 * # Text-Quote Anchoring
 *
 * A highlight is stored as a **quote** rather than as offsets or node paths:
 * the exact highlighted text plus a bounded window of context on either side.
 * Offsets go stale as soon as anything is typed above the highlight; a quote
 * keeps resolving as long as the quoted text exists somewhere in the
 * container.
 *
 * ## Capture
 *
 * [`TextAnchor::capture`] turns a live selection span into an anchor. Edge
 * whitespace is trimmed from the selection first, so a captured quote never
 * starts or ends inside a whitespace run. Empty, collapsed and whitespace-only
 * selections produce no anchor.
 *
 * ## Resolution
 *
 * [`resolve`] searches for every occurrence of `exact` and scores each one by
 * how much of `prefix`/`suffix` matches the text around it. The best score
 * wins; equal scores go to the first occurrence in document order so repeated
 * passes never flip between candidates.
 *
 * Under [`MatchMode::CollapseWhitespace`] matching happens on the rendered
 * text (whitespace runs collapsed). The literal text found may then differ
 * from `exact`, which callers surface as drift. Matching is never fuzzy.
 */

pub mod anchor;
pub mod resolve;

pub use anchor::{AnchorOptions, DEFAULT_CONTEXT_CHARS, MatchMode, TextAnchor};
pub use resolve::{Resolution, matching_view, resolve, resolve_in};
