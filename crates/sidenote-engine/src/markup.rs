//! Conversions between markup and the plain text the editor holds.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::text::Span;

/// Render markdown to the plain text an editor would display.
///
/// Blocks are separated by a blank line, list items are written as `- `
/// lines indented two spaces per nesting level, and raw HTML is dropped.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    let mut list_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::List(_)) => {
                if list_depth == 0 {
                    start_block(&mut out);
                }
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
            }
            Event::Start(Tag::Item) => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                out.push_str("- ");
            }
            Event::Start(
                Tag::Paragraph | Tag::Heading { .. } | Tag::CodeBlock(_) | Tag::BlockQuote(_),
            ) if list_depth == 0 => start_block(&mut out),
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => {
                start_block(&mut out);
                out.push_str("---");
            }
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn start_block(out: &mut String) {
    if out.is_empty() {
        return;
    }
    let kept = out.trim_end_matches('\n').len();
    out.truncate(kept);
    out.push_str("\n\n");
}

/// Escape `content` as HTML, wrapping each highlighted span in `<mark>`.
///
/// Spans must lie on character boundaries of `content`. Where highlights
/// overlap, the earlier one wins the shared text. Newlines become `<br>`.
pub fn render_html(content: &str, highlights: &[(&str, Span)]) -> String {
    let mut ordered: Vec<_> = highlights
        .iter()
        .filter(|(_, span)| span.fits(content))
        .collect();
    ordered.sort_by_key(|(_, span)| span.start);

    let mut out = String::with_capacity(content.len() + highlights.len() * 32);
    let mut cursor = 0;
    for (id, span) in ordered {
        let start = span.start.max(cursor);
        if start >= span.end {
            continue;
        }
        push_text(&mut out, &content[cursor..start]);
        out.push_str("<mark data-highlight-id=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(id));
        out.push_str("\">");
        push_text(&mut out, &content[start..span.end]);
        out.push_str("</mark>");
        cursor = span.end;
    }
    push_text(&mut out, &content[cursor..]);
    out
}

fn push_text(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<br>");
        }
        out.push_str(&html_escape::encode_text(line));
    }
}
