use crate::source::SourceMap;
use super::Diagnostic;

/// One diagnostic as a single-line JSON object.
pub fn render(d: &Diagnostic) -> String {
    let mut obj = serde_json::json!({
        "severity": "error",
        "phase": d.phase.as_str(),
        "message": d.message,
        "line": d.line,
        "text": d.header(),
    });

    if let Some(location) = d.location.as_deref().filter(|l| !l.is_empty()) {
        obj["location"] = serde_json::Value::from(location.trim_start());
    }

    if let Some(span) = d.span {
        let mut span_obj = serde_json::json!({
            "start": span.start,
            "end": span.end,
        });
        if let Some(source) = &d.source {
            let (_, col) = SourceMap::new(source).lookup(span.start);
            span_obj["col"] = serde_json::Value::from(col);
        }
        obj["span"] = span_obj;
    }

    serde_json::to_string(&obj).unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}
