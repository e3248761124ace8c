use crate::source::{SourceMap, Span};
use super::Diagnostic;

/// Terminal renderer: the report header, then the offending source line
/// with carets under the span when one is known.
pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();
        for line in d.header().lines() {
            out.push_str(&self.bold_red(line));
            out.push('\n');
        }

        let Some(source) = &d.source else {
            return out;
        };
        let map = SourceMap::new(source);
        let line_text = map.line_text(source, d.line);
        if line_text.trim().is_empty() {
            return out;
        }

        let gutter = d.line.to_string().len();
        let pipe = self.cyan("|");
        let pad = " ".repeat(gutter);
        let line_num = self.cyan(&format!("{:>gutter$}", d.line));

        out.push_str(&format!("{pad} {pipe}\n"));
        out.push_str(&format!("{line_num} {pipe} {line_text}\n"));

        if let Some(span) = d.span {
            let (indent, width) = caret_columns(source, &map, line_text, span);
            let indent = " ".repeat(indent);
            let carets = self.bold_red(&"^".repeat(width.max(1)));
            out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
        }
        out
    }
}

/// Character offset of `span` within its line and the number of characters
/// it covers on that line.
fn caret_columns(source: &str, map: &SourceMap, line_text: &str, span: Span) -> (usize, usize) {
    let (_, col) = map.lookup(span.start);
    let line_start = span.start - (col - 1);
    let line_end = line_start + line_text.len();

    let indent = source.get(line_start..span.start).map_or(col - 1, |s| s.chars().count());
    let end = span.end.clamp(span.start, line_end.max(span.start));
    let width = source.get(span.start..end).map_or(0, |s| s.chars().count());
    (indent, width)
}
