//! Rendered view of container text.
//!
//! Rendered text collapses every run of whitespace into a single space, the
//! way a layout engine displays it. Quotes are matched against this view and
//! the match is mapped back onto the literal source bytes through a per-byte
//! offset table.

use super::span::Span;

/// Text as it is matched, plus the map back to literal byte offsets.
#[derive(Debug, Clone)]
pub struct RenderedText {
    text: String,
    /// Literal start offset for every byte of `text`.
    starts: Vec<usize>,
    /// Literal end offset for every byte of `text`.
    ends: Vec<usize>,
}

impl RenderedText {
    /// Build the whitespace-collapsed view of `source`.
    pub fn collapsed(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut starts = Vec::with_capacity(source.len());
        let mut ends = Vec::with_capacity(source.len());

        let mut chars = source.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch.is_whitespace() {
                let mut run_end = idx + ch.len_utf8();
                while let Some(&(next_idx, next)) = chars.peek() {
                    if !next.is_whitespace() {
                        break;
                    }
                    run_end = next_idx + next.len_utf8();
                    chars.next();
                }
                text.push(' ');
                starts.push(idx);
                ends.push(run_end);
            } else {
                let width = ch.len_utf8();
                text.push(ch);
                for k in 0..width {
                    starts.push(idx + k);
                    ends.push(idx + k + 1);
                }
            }
        }

        Self { text, starts, ends }
    }

    /// The identity view: matching happens on the literal bytes.
    pub fn literal(source: &str) -> Self {
        Self {
            text: source.to_string(),
            starts: (0..source.len()).collect(),
            ends: (1..=source.len()).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Map a span of the rendered view onto literal source bytes.
    ///
    /// An empty span maps to the literal offset of its position.
    pub fn to_source(&self, span: Span) -> Option<Span> {
        if span.end > self.text.len() || span.start > span.end {
            return None;
        }
        if span.is_empty() {
            let at = self
                .starts
                .get(span.start)
                .copied()
                .or_else(|| self.ends.last().copied())
                .unwrap_or(0);
            return Some(Span::caret(at));
        }
        Some(Span::new(self.starts[span.start], self.ends[span.end - 1]))
    }
}

/// Collapse whitespace runs in a quote so it can be compared against a
/// [`RenderedText`] built with [`RenderedText::collapsed`].
pub fn collapse_whitespace(s: &str) -> String {
    RenderedText::collapsed(s).text
}
