use serde::{Deserialize, Serialize};

/// A byte range `[start, end)` into the container text.
///
/// Resolved anchors are spans rather than copied text, so slicing the live
/// text with a span always reproduces what is currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-length span, i.e. a caret.
    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Length in bytes; zero for inverted spans.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// True when both endpoints lie inside `text` on char boundaries.
    #[must_use]
    pub fn fits(self, text: &str) -> bool {
        self.start <= self.end
            && self.end <= text.len()
            && text.is_char_boundary(self.start)
            && text.is_char_boundary(self.end)
    }

    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Intersection of two spans, `None` when they do not overlap.
    #[must_use]
    pub fn intersect(self, other: Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Span { start, end })
    }

    /// Borrow the text this span covers, `None` if the span does not fit.
    pub fn slice(self, text: &str) -> Option<&str> {
        if self.fits(text) {
            Some(&text[self.start..self.end])
        } else {
            None
        }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}
