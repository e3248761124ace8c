use log::debug;

use crate::chunk::{Chunk, OpCode};
use crate::disassembler;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::source::Span;
use crate::value::Value;

/// Where a syntax error points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The error was found at end of input.
    AtEnd,
    /// The error was found at this lexeme.
    At(String),
    /// The offending token was a lexical error; its message says it all.
    Lexical,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::AtEnd => write!(f, " at end"),
            Location::At(lexeme) => write!(f, " at '{}'", lexeme),
            Location::Lexical => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub span: Span,
    pub location: Location,
    pub message: String,
}

/// Every syntax error reported while compiling one source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_errors(.errors))]
pub struct CompileError {
    pub errors: Vec<SyntaxError>,
}

fn join_errors(errors: &[SyntaxError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

// ── Precedence climbing ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// One level tighter; binary operators parse their right operand here.
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    Literal,
}

#[derive(Debug, Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    const NONE: ParseRule = ParseRule { prefix: None, infix: None, precedence: Precedence::None };

    fn new(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> Self {
        ParseRule { prefix, infix, precedence }
    }
}

fn rule(kind: TokenKind) -> ParseRule {
    use ParseFn::*;
    match kind {
        TokenKind::LeftParen => ParseRule::new(Some(Grouping), None, Precedence::None),
        TokenKind::Minus => ParseRule::new(Some(Unary), Some(Binary), Precedence::Term),
        TokenKind::Plus => ParseRule::new(None, Some(Binary), Precedence::Term),
        TokenKind::Slash | TokenKind::Star => ParseRule::new(None, Some(Binary), Precedence::Factor),
        TokenKind::Bang => ParseRule::new(Some(Unary), None, Precedence::None),
        TokenKind::BangEqual | TokenKind::EqualEqual => {
            ParseRule::new(None, Some(Binary), Precedence::Equality)
        }
        TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual => {
            ParseRule::new(None, Some(Binary), Precedence::Comparison)
        }
        TokenKind::Number => ParseRule::new(Some(Number), None, Precedence::None),
        TokenKind::False | TokenKind::True | TokenKind::Nil => {
            ParseRule::new(Some(Literal), None, Precedence::None)
        }
        _ => ParseRule::NONE,
    }
}

// ── Compiler ─────────────────────────────────────────────────────────

/// Deepest expression nesting the compiler accepts.
const MAX_DEPTH: usize = 256;

/// Parser state for one compilation. Tokens are pulled from the scanner on
/// demand and bytecode is written as soon as each construct is recognised.
struct Parser<'src> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    chunk: Chunk,
    errors: Vec<SyntaxError>,
    panic_mode: bool,
    /// Current `parse_precedence` nesting.
    depth: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        let placeholder = Token { kind: TokenKind::Eof, lexeme: "", line: 1, span: Span::UNKNOWN };
        Parser {
            scanner: Scanner::new(source),
            current: placeholder,
            previous: placeholder,
            chunk: Chunk::new(),
            errors: Vec::new(),
            panic_mode: false,
            depth: 0,
        }
    }

    fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    // ---- Token plumbing ----

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // ---- Error reporting ----

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    /// Records the error unless already panicking; the first error of a
    /// cascade is the only one worth showing.
    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => Location::AtEnd,
            TokenKind::Error => Location::Lexical,
            _ => Location::At(token.lexeme.to_string()),
        };
        self.errors.push(SyntaxError {
            line: token.line,
            span: token.span,
            location,
            message: message.to_string(),
        });
    }

    // ---- Emission ----

    fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.chunk.write_op(op, line);
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.chunk.add_constant(value);
        match u8::try_from(index) {
            Ok(index) => index,
            Err(_) => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        let line = self.previous.line;
        self.emit_op(OpCode::Constant);
        self.chunk.write(index, line);
    }

    /// Terminates the chunk; runs on every path so execution never walks
    /// off the end of the code.
    fn finish(mut self) -> (Chunk, Vec<SyntaxError>) {
        self.emit_op(OpCode::Return);
        (self.chunk, self.errors)
    }

    // ---- Expressions ----

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// Bounds the recursion through grouping and unary operands so nested
    /// input is reported instead of exhausting the native stack.
    fn parse_precedence(&mut self, precedence: Precedence) {
        if self.depth >= MAX_DEPTH {
            self.error_at_current("Expression nests too deeply.");
            return;
        }
        self.depth += 1;
        self.parse_operand(precedence);
        self.depth -= 1;
    }

    fn parse_operand(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        self.apply(prefix);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                self.apply(infix);
            }
        }
    }

    fn apply(&mut self, parse_fn: ParseFn) {
        match parse_fn {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::Literal => self.literal(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => {}
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(rule(operator).precedence.next());
        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => {}
        }
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => {}
        }
    }
}

/// Compiles one expression into a chunk ending in `OP_RETURN`. Any syntax
/// error makes the whole chunk unusable, so it is dropped and the errors
/// are returned instead.
pub fn compile(source: &str) -> Result<Chunk, CompileError> {
    let mut parser = Parser::new(source);
    parser.advance();
    parser.expression();
    parser.consume(TokenKind::Eof, "Expect end of expression.");

    let had_error = parser.had_error();
    let (chunk, errors) = parser.finish();
    if had_error {
        return Err(CompileError { errors });
    }

    if log::log_enabled!(log::Level::Debug) {
        debug!("{}", disassembler::disassemble_chunk(&chunk, "code").trim_end());
    }
    Ok(chunk)
}
