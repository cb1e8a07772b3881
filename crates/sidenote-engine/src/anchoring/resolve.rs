use crate::anchoring::{AnchorOptions, MatchMode, TextAnchor};
use crate::text::{RenderedText, Span, collapse_whitespace};

/// A located quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Literal byte span in the container text
    pub span: Span,
    /// Characters of prefix + suffix context that matched
    pub score: usize,
}

/// Build the view anchors are matched against for `mode`.
pub fn matching_view(text: &str, mode: MatchMode) -> RenderedText {
    match mode {
        MatchMode::Exact => RenderedText::literal(text),
        MatchMode::CollapseWhitespace => RenderedText::collapsed(text),
    }
}

/// Locate `anchor` in `text`.
///
/// Returns the literal span of the best-scoring occurrence of the quote, or
/// `None` when the quote is empty or does not occur at all.
pub fn resolve(text: &str, anchor: &TextAnchor, options: &AnchorOptions) -> Option<Span> {
    let view = matching_view(text, options.match_mode);
    resolve_in(&view, anchor, options).map(|r| r.span)
}

/// Locate `anchor` in a prebuilt view; lets a batch share one snapshot.
pub fn resolve_in(
    view: &RenderedText,
    anchor: &TextAnchor,
    options: &AnchorOptions,
) -> Option<Resolution> {
    if anchor.is_empty() {
        return None;
    }

    let normalize = |s: &str| -> String {
        match options.match_mode {
            MatchMode::Exact => s.to_string(),
            MatchMode::CollapseWhitespace => collapse_whitespace(s),
        }
    };
    let exact = normalize(&anchor.exact);
    let prefix = normalize(&anchor.prefix);
    let suffix = normalize(&anchor.suffix);

    let haystack = view.as_str();
    let mut best: Option<(usize, usize)> = None;

    for candidate in occurrences(haystack, &exact) {
        let before = &haystack[..candidate];
        let after = &haystack[candidate + exact.len()..];
        let score = common_suffix_chars(before, &prefix, options.context_chars)
            + common_prefix_chars(after, &suffix, options.context_chars);

        // Strictly greater: equal scores keep the earlier occurrence
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    let (start, score) = best?;
    let span = view.to_source(Span::new(start, start + exact.len()))?;
    Some(Resolution { span, score })
}

/// Start offsets of every occurrence of `needle`, overlapping ones included.
fn occurrences<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    let mut from = 0;
    std::iter::from_fn(move || {
        if needle.is_empty() || from > haystack.len() {
            return None;
        }
        let found = from + haystack[from..].find(needle)?;
        let step = haystack[found..].chars().next().map_or(1, char::len_utf8);
        from = found + step;
        Some(found)
    })
}

fn common_suffix_chars(text: &str, context: &str, cap: usize) -> usize {
    text.chars()
        .rev()
        .zip(context.chars().rev())
        .take(cap)
        .take_while(|(a, b)| a == b)
        .count()
}

fn common_prefix_chars(text: &str, context: &str, cap: usize) -> usize {
    text.chars()
        .zip(context.chars())
        .take(cap)
        .take_while(|(a, b)| a == b)
        .count()
}
