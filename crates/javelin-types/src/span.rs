use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a node came from, as 1-based line and column positions.
///
/// Nodes built without source text carry the all-zero default span.
/// Spans order by start position, then end position.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// An empty span at `line:col`.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    pub fn is_synthetic(&self) -> bool {
        self.start_line == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Program text kept around so diagnostics can quote the offending line.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    lines: Vec<String>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Line `number` (1-based) without its terminator.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.lines.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_span_is_synthetic() {
        assert!(Span::default().is_synthetic());
        assert!(!Span::point(1, 1).is_synthetic());
    }

    #[test]
    fn test_spans_order_by_start() {
        let mut spans = vec![Span::point(3, 1), Span::new(1, 9, 2, 1), Span::point(1, 2)];
        spans.sort();
        assert_eq!(spans, vec![Span::point(1, 2), Span::new(1, 9, 2, 1), Span::point(3, 1)]);
    }

    #[test]
    fn test_display_is_start_position() {
        assert_eq!(Span::new(3, 7, 3, 15).to_string(), "3:7");
    }

    #[test]
    fn test_line_lookup() {
        let src = SourceFile::new("Main.java", "class A {}\r\nint x = 1;\n\nprintln(x);");
        assert_eq!(src.line(1), Some("class A {}"));
        assert_eq!(src.line(2), Some("int x = 1;"));
        assert_eq!(src.line(3), Some(""));
        assert_eq!(src.line(4), Some("println(x);"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(5), None);
    }
}
