use log::trace;

use crate::chunk::{Chunk, OpCode};
use crate::compiler::{self, CompileError};
use crate::disassembler;
use crate::value::Value;

/// Maximum number of values the stack may hold.
pub const STACK_MAX: usize = 256;

/// What went wrong while executing a single instruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmFault {
    #[error("Operand must be a number.")]
    OperandNotNumber,
    #[error("Operands must be numbers.")]
    OperandsNotNumbers,
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Stack underflow.")]
    StackUnderflow,
    #[error("Unknown opcode {op}.")]
    UnknownOpcode { op: u8 },
    #[error("Unexpected end of bytecode.")]
    UnexpectedEnd,
    #[error("Constant index {index} out of range.")]
    BadConstant { index: u8 },
}

/// A fault together with the source line of the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}\n[line {line}] in script")]
pub struct RuntimeError {
    pub kind: VmFault,
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    pub fn result_code(&self) -> ResultCode {
        match self {
            InterpretError::Compile(_) => ResultCode::CompileError,
            InterpretError::Runtime(_) => ResultCode::RuntimeError,
        }
    }
}

/// Outcome of one `interpret` call, as the command line reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    CompileError,
    RuntimeError,
}

impl ResultCode {
    /// Process exit status for this outcome (sysexits: 65 data error,
    /// 70 internal software error).
    pub fn exit_code(self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::CompileError => 65,
            ResultCode::RuntimeError => 70,
        }
    }
}

impl<T> From<&Result<T, InterpretError>> for ResultCode {
    fn from(result: &Result<T, InterpretError>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(e) => e.result_code(),
        }
    }
}

type StepResult = Result<Option<Value>, VmFault>;

// ── VM ───────────────────────────────────────────────────────────────

/// Stack machine. Long-lived: the stack is empty between runs, so one `Vm`
/// can interpret any number of sources.
#[derive(Debug, Default)]
pub struct Vm {
    stack: Vec<Value>,
}

impl Vm {
    pub fn new() -> Self {
        Vm { stack: Vec::with_capacity(STACK_MAX) }
    }

    /// Compiles `source` and runs it. A compile error leaves the stack
    /// untouched.
    pub fn interpret(&mut self, source: &str) -> Result<Value, InterpretError> {
        let chunk = compiler::compile(source)?;
        Ok(self.run(&chunk)?)
    }

    /// Executes `chunk` until `OP_RETURN` and yields the returned value.
    pub fn run(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        let mut ip = 0;
        loop {
            let start = ip;
            if log::log_enabled!(log::Level::Trace) {
                self.trace_instruction(chunk, start);
            }
            match self.step(chunk, &mut ip) {
                Ok(Some(value)) => {
                    self.stack.clear();
                    return Ok(value);
                }
                Ok(None) => {}
                Err(kind) => {
                    self.stack.clear();
                    return Err(RuntimeError { kind, line: chunk.line(start) });
                }
            }
        }
    }

    /// Values currently on the stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    fn trace_instruction(&self, chunk: &Chunk, offset: usize) {
        let stack: String = self.stack.iter().map(|v| format!("[ {v} ]")).collect();
        let (text, _) = disassembler::disassemble_instruction(chunk, offset);
        trace!("          {stack}");
        trace!("{text}");
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn step(&mut self, chunk: &Chunk, ip: &mut usize) -> StepResult {
        let byte = read_byte(chunk, ip)?;
        let op = OpCode::try_from(byte).map_err(|_| VmFault::UnknownOpcode { op: byte })?;

        match op {
            OpCode::Constant => {
                let index = read_byte(chunk, ip)?;
                let value = chunk
                    .constants
                    .get(index as usize)
                    .copied()
                    .ok_or(VmFault::BadConstant { index })?;
                self.push(value)?;
            }
            OpCode::Nil => self.push(Value::Nil)?,
            OpCode::True => self.push(Value::Bool(true))?,
            OpCode::False => self.push(Value::Bool(false))?,
            OpCode::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a == b))?;
            }
            OpCode::Greater => self.binary(|a, b| Value::Bool(a > b))?,
            OpCode::Less => self.binary(|a, b| Value::Bool(a < b))?,
            OpCode::Add => self.binary(|a, b| Value::Number(a + b))?,
            OpCode::Subtract => self.binary(|a, b| Value::Number(a - b))?,
            OpCode::Multiply => self.binary(|a, b| Value::Number(a * b))?,
            OpCode::Divide => self.binary(|a, b| Value::Number(a / b))?,
            OpCode::Not => {
                let v = self.pop()?;
                self.push(Value::Bool(v.is_falsey()))?;
            }
            OpCode::Negate => {
                let n = self.peek(0)?.as_number().ok_or(VmFault::OperandNotNumber)?;
                self.pop()?;
                self.push(Value::Number(-n))?;
            }
            OpCode::Return => return Ok(Some(self.pop()?)),
        }
        Ok(None)
    }

    /// Pops the right operand, then the left, and pushes `f(left, right)`.
    /// Both must be numbers; on a type error the operands stay put.
    fn binary(&mut self, f: impl Fn(f64, f64) -> Value) -> Result<(), VmFault> {
        let (Some(a), Some(b)) = (self.peek(1)?.as_number(), self.peek(0)?.as_number()) else {
            return Err(VmFault::OperandsNotNumbers);
        };
        self.pop()?;
        self.pop()?;
        self.push(f(a, b))
    }

    // ── Stack ────────────────────────────────────────────────────────

    fn push(&mut self, value: Value) -> Result<(), VmFault> {
        if self.stack.len() >= STACK_MAX {
            return Err(VmFault::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, VmFault> {
        self.stack.pop().ok_or(VmFault::StackUnderflow)
    }

    fn peek(&self, distance: usize) -> Result<Value, VmFault> {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .and_then(|i| self.stack.get(i))
            .copied()
            .ok_or(VmFault::StackUnderflow)
    }
}

fn read_byte(chunk: &Chunk, ip: &mut usize) -> Result<u8, VmFault> {
    let byte = *chunk.code.get(*ip).ok_or(VmFault::UnexpectedEnd)?;
    *ip += 1;
    Ok(byte)
}

/// Compiles and runs `source` on a fresh VM.
pub fn interpret(source: &str) -> Result<Value, InterpretError> {
    Vm::new().interpret(source)
}

// ── Tests ────────────────────────────────────────────────────────────
