use logos::Logos;

use crate::source::Span;

const UNEXPECTED_CHARACTER: &str = "Unexpected character.";
const UNTERMINATED_STRING: &str = "Unterminated string.";

/// Lexical failures. The scanner turns them into `TokenKind::Error` tokens
/// whose lexeme is the message, so the compiler reports them like any
/// other syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
pub enum LexError {
    #[default]
    #[error("{}", UNEXPECTED_CHARACTER)]
    UnexpectedCharacter,
    #[error("{}", UNTERMINATED_STRING)]
    UnterminatedString,
}

impl LexError {
    pub fn message(self) -> &'static str {
        match self {
            LexError::UnexpectedCharacter => UNEXPECTED_CHARACTER,
            LexError::UnterminatedString => UNTERMINATED_STRING,
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum TokenKind {
    // Single-character punctuation
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token(";")]
    Semicolon,
    #[token("/")]
    Slash,
    #[token("*")]
    Star,

    // One or two characters
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,

    // Literals. A fraction needs a digit after the dot: `1.` is `1` then `.`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
    #[regex(r#""[^"]*"?"#, string_terminated)]
    String,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    // Keywords
    #[token("and")]
    And,
    #[token("class")]
    Class,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("fun")]
    Fun,
    #[token("if")]
    If,
    #[token("nil")]
    Nil,
    #[token("or")]
    Or,
    #[token("print")]
    Print,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("var")]
    Var,
    #[token("while")]
    While,

    // Sentinels, produced by `Scanner` rather than by the lexer
    Error,
    Eof,
}

fn string_terminated(lex: &mut logos::Lexer<TokenKind>) -> Result<(), LexError> {
    let slice = lex.slice();
    if slice.len() >= 2 && slice.ends_with('"') {
        Ok(())
    } else {
        Err(LexError::UnterminatedString)
    }
}

/// A token borrowed from the source. For `TokenKind::Error` the lexeme is
/// the error message instead of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    /// 1-based line where the token starts.
    pub line: usize,
    pub span: Span,
}

/// Lazy token stream over one source text. Once `Eof` has been produced,
/// every later call produces `Eof` again.
pub struct Scanner<'src> {
    source: &'src str,
    lexer: logos::Lexer<'src, TokenKind>,
    line: usize,
    /// Byte offset up to which newlines have been counted into `line`.
    counted_to: usize,
    finished: bool,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Scanner {
            source,
            lexer: TokenKind::lexer(source),
            line: 1,
            counted_to: 0,
            finished: false,
        }
    }

    pub fn scan_token(&mut self) -> Token<'src> {
        if self.finished {
            return self.eof();
        }

        let Some(result) = self.lexer.next() else {
            self.finished = true;
            self.count_lines_to(self.source.len());
            return self.eof();
        };

        let span = Span::from(self.lexer.span());
        self.count_lines_to(span.start);

        match result {
            Ok(kind) => Token { kind, lexeme: self.lexer.slice(), line: self.line, span },
            Err(e) => Token { kind: TokenKind::Error, lexeme: e.message(), line: self.line, span },
        }
    }

    /// Newlines live in skipped whitespace and inside string literals, so
    /// the line counter catches up on everything between the previous token
    /// start and `offset`.
    fn count_lines_to(&mut self, offset: usize) {
        if offset <= self.counted_to {
            return;
        }
        let gap = self.source.as_bytes().get(self.counted_to..offset).unwrap_or(&[]);
        self.line += gap.iter().filter(|b| **b == b'\n').count();
        self.counted_to = offset;
    }

    fn eof(&self) -> Token<'src> {
        let end = self.source.len();
        Token { kind: TokenKind::Eof, lexeme: "", line: self.line, span: Span::new(end, end) }
    }
}
