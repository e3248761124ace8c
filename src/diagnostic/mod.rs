pub mod ansi;
pub mod json;

use crate::compiler::{CompileError, SyntaxError};
use crate::source::Span;
use crate::vm::{InterpretError, RuntimeError};

/// Which stage of the pipeline reported the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compile,
    Runtime,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Compile => "compile",
            Phase::Runtime => "runtime",
        }
    }
}

/// One reportable error, independent of how it is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub message: String,
    pub line: usize,
    /// Compile errors only: `" at 'x'"`, `" at end"`, or empty.
    pub location: Option<String>,
    pub span: Option<Span>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn compile(message: impl Into<String>, line: usize) -> Self {
        Diagnostic {
            phase: Phase::Compile,
            message: message.into(),
            line,
            location: Some(String::new()),
            span: None,
            source: None,
        }
    }

    pub fn runtime(message: impl Into<String>, line: usize) -> Self {
        Diagnostic {
            phase: Phase::Runtime,
            message: message.into(),
            line,
            location: None,
            span: None,
            source: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The report line(s) in the interpreter's fixed format:
    /// `[line N] Error at 'x': msg` or `msg\n[line N] in script`.
    pub fn header(&self) -> String {
        match self.phase {
            Phase::Compile => format!(
                "[line {}] Error{}: {}",
                self.line,
                self.location.as_deref().unwrap_or(""),
                self.message
            ),
            Phase::Runtime => format!("{}\n[line {}] in script", self.message, self.line),
        }
    }
}

impl From<&SyntaxError> for Diagnostic {
    fn from(e: &SyntaxError) -> Self {
        Diagnostic::compile(e.message.clone(), e.line)
            .with_location(e.location.to_string())
            .with_span(e.span)
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(e: &RuntimeError) -> Self {
        Diagnostic::runtime(e.kind.to_string(), e.line)
    }
}

/// Every syntax error of a failed compilation, in report order.
pub fn from_compile_error(e: &CompileError, source: &str) -> Vec<Diagnostic> {
    e.errors
        .iter()
        .map(|err| Diagnostic::from(err).with_source(source))
        .collect()
}

pub fn from_interpret_error(e: &InterpretError, source: &str) -> Vec<Diagnostic> {
    match e {
        InterpretError::Compile(e) => from_compile_error(e, source),
        InterpretError::Runtime(e) => vec![Diagnostic::from(e).with_source(source)],
    }
}
