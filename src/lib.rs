//! Expression compiler and stack-based bytecode VM.
//!
//! Source text is scanned into tokens, compiled in a single pass into a
//! [`Chunk`], and executed by a [`Vm`].

pub mod chunk;
pub mod compiler;
pub mod diagnostic;
pub mod disassembler;
pub mod lexer;
pub mod source;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, OpCode};
pub use compiler::{compile, CompileError, SyntaxError};
pub use value::Value;
pub use vm::{interpret, InterpretError, ResultCode, RuntimeError, Vm};
