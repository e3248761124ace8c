// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span { start: range.start, end: range.end }
    }
}

/// Maps byte offsets to line/column positions within source text.
///
/// Lines are split on `\n` only, the same rule the scanner uses when it
/// numbers tokens, so a line reported by the compiler or the VM always
/// resolves to the text the user wrote on that line.
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceMap { line_starts }
    }

    /// Returns (line, col), both 1-based.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = offset.saturating_sub(self.line_starts[line]);
        (line + 1, col + 1)
    }

    /// Returns the full text of the given 1-based line number.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        if line == 0 || line > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[line - 1];
        let end = if line < self.line_starts.len() {
            self.line_starts[line]
        } else {
            source.len()
        };
        source
            .get(start..end)
            .unwrap_or("")
            .trim_end_matches('\n')
            .trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_first_line() {
        let sm = SourceMap::new("1 + 2");
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(4), (1, 5));
    }

    #[test]
    fn lookup_after_newline() {
        let src = "1 +\n2";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(3), (1, 4)); // the newline itself
        assert_eq!(sm.lookup(4), (2, 1));
        assert_eq!(sm.lookup(5), (2, 2));
    }

    #[test]
    fn line_text_strips_terminators() {
        let src = "(1 +\r\n 2)\n";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "(1 +");
        assert_eq!(sm.line_text(src, 2), " 2)");
        assert_eq!(sm.line_text(src, 3), "");
    }

    #[test]
    fn line_text_out_of_bounds() {
        let src = "nil";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 0), "");
        assert_eq!(sm.line_text(src, 7), "");
    }

    #[test]
    fn span_from_range() {
        let span = Span::from(3..7);
        assert_eq!(span, Span::new(3, 7));
        assert_eq!(span.len(), 4);
        assert!(Span::UNKNOWN.is_empty());
    }
}
