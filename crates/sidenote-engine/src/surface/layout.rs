use crate::text::Span;

/// One row of laid-out text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualLine {
    pub row: usize,
    /// Byte span of the row, newline excluded
    pub span: Span,
}

/// Lay `text` out in rows of at most `columns` characters.
///
/// Hard breaks at `\n` always start a new row; long lines wrap at the column
/// limit. An empty line still occupies a row.
pub fn wrap_lines(text: &str, columns: usize) -> Vec<VisualLine> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    let mut offset = 0;

    for hard_line in text.split('\n') {
        let mut chunk_start = offset;
        let mut count = 0;
        for (idx, _) in hard_line.char_indices() {
            if count == columns {
                lines.push(VisualLine {
                    row: lines.len(),
                    span: Span::new(chunk_start, offset + idx),
                });
                chunk_start = offset + idx;
                count = 0;
            }
            count += 1;
        }
        lines.push(VisualLine {
            row: lines.len(),
            span: Span::new(chunk_start, offset + hard_line.len()),
        });
        offset += hard_line.len() + 1;
    }

    lines
}

/// Row and column of a byte offset. Offsets on a soft-wrap boundary belong
/// to the following row.
pub(crate) fn cell_of(text: &str, lines: &[VisualLine], offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let line = lines
        .iter()
        .rev()
        .find(|line| line.span.start <= offset)
        .copied()
        .unwrap_or(VisualLine {
            row: 0,
            span: Span::caret(0),
        });
    let end = offset.min(line.span.end);
    let column = text
        .get(line.span.start..end)
        .map_or(0, |s| s.chars().count());
    (column, line.row)
}

/// Byte offset at a row/column, clamped to the row's text.
pub(crate) fn offset_of(text: &str, lines: &[VisualLine], column: usize, row: usize) -> usize {
    let Some(line) = lines.get(row).or_else(|| lines.last()) else {
        return 0;
    };
    let row_text = text.get(line.span.start..line.span.end).unwrap_or("");
    row_text
        .char_indices()
        .nth(column)
        .map_or(line.span.end, |(idx, _)| line.span.start + idx)
}
