use serde::{Deserialize, Serialize};

use crate::text::{Span, head_chars, tail_chars};

/// Context characters captured on each side of a quote.
pub const DEFAULT_CONTEXT_CHARS: usize = 32;

/// How a quote is compared against container text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Literal substring match on the source text
    Exact,
    /// Match on rendered text where whitespace runs collapse to one space
    #[default]
    CollapseWhitespace,
}

/// Tunables shared by capture and resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorOptions {
    /// Maximum characters of prefix/suffix context
    pub context_chars: usize,
    pub match_mode: MatchMode,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            match_mode: MatchMode::default(),
        }
    }
}

/// Position-independent reference to a span of text.
///
/// Anchors are value objects. When the live text drifts away from `exact`
/// a new anchor replaces the old one; see `Highlight::replace_exact`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextAnchor {
    pub exact: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl TextAnchor {
    pub fn new(
        exact: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            exact: exact.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Capture an anchor for `span` of `text`.
    ///
    /// Returns `None` when there is nothing to anchor: a collapsed or
    /// out-of-bounds span, or a selection that is empty once edge whitespace
    /// is trimmed. Callers treat `None` as a no-op.
    pub fn capture(text: &str, span: Span, options: &AnchorOptions) -> Option<TextAnchor> {
        let span = trim_span(text, span)?;

        let exact = &text[span.start..span.end];
        let prefix = tail_chars(&text[..span.start], options.context_chars);
        let suffix = head_chars(&text[span.end..], options.context_chars);

        Some(TextAnchor::new(exact, prefix, suffix))
    }

    /// An anchor with no quoted text can never resolve.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

/// Shrink `span` so it neither starts nor ends on whitespace.
fn trim_span(text: &str, span: Span) -> Option<Span> {
    let selected = span.slice(text)?;
    let leading = selected.len() - selected.trim_start().len();
    let trimmed = selected.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + leading;
    Some(Span::new(start, start + trimmed.len()))
}
