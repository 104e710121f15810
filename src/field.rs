use std::ops::Range;

use crate::config::ColumnFallback;

/// Extract the sort key of a line.
///
/// # Arguments
/// * `line` - the line without its terminator
/// * `column` - the index of the field, starting at 1. Column 0 uses the complete line
/// * `delimiter` - the literal field separator
///
/// When the line has fewer than `column` fields the complete line is returned. An empty
/// delimiter splits the line into single characters.
///
/// # Examples
/// ```
/// use line_file_sort::field::extract_key;
///
/// assert_eq!(extract_key("a b c", 2, " "), "b");
/// assert_eq!(extract_key("a b c", 0, " "), "a b c");
/// // out of range column falls back to the complete line
/// assert_eq!(extract_key("a b c", 4, " "), "a b c");
/// ```
pub fn extract_key<'a>(line: &'a str, column: usize, delimiter: &str) -> &'a str {
    &line[key_range(line, column, delimiter, ColumnFallback::WholeLine)]
}

/// Byte range of the key within `line`, applying `fallback` for a missing column.
pub(crate) fn key_range(line: &str, column: usize, delimiter: &str, fallback: ColumnFallback) -> Range<usize> {
    if column == 0 {
        return 0..line.len();
    }

    // an empty delimiter makes every character a field
    if delimiter.is_empty() {
        return match line.char_indices().nth(column - 1) {
            Some((start, c)) => start..start + c.len_utf8(),
            None => missing_column(line, fallback),
        };
    }

    let mut start = 0;
    let mut field = 1;
    for (position, _) in line.match_indices(delimiter) {
        if field == column {
            return start..position;
        }
        start = position + delimiter.len();
        field += 1;
    }

    if field == column {
        start..line.len()
    } else {
        missing_column(line, fallback)
    }
}

fn missing_column(line: &str, fallback: ColumnFallback) -> Range<usize> {
    match fallback {
        ColumnFallback::WholeLine => 0..line.len(),
        ColumnFallback::Empty => line.len()..line.len(),
    }
}
