use serde::Serialize;

use crate::value::Value;

// ── Opcodes ─────────────────────────────────────────────────────────
//
// One byte each. Only CONSTANT carries an operand: a one-byte index into
// the chunk's constant pool.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum OpCode {
    Constant = 0,
    Nil = 1,
    True = 2,
    False = 3,
    Equal = 4,
    Greater = 5,
    Less = 6,
    Add = 7,
    Subtract = 8,
    Multiply = 9,
    Divide = 10,
    Not = 11,
    Negate = 12,
    Return = 13,
}

impl OpCode {
    pub const ALL: [OpCode; 14] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Return,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Nil => "OP_NIL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Return => "OP_RETURN",
        }
    }

    /// Number of operand bytes following the opcode byte.
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::Constant => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown opcode: {0}")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(UnknownOpcode(byte))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mnemonic '{0}'")]
pub struct UnknownMnemonic(pub String);

impl std::str::FromStr for OpCode {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == s)
            .ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

// ── Chunk ────────────────────────────────────────────────────────────

/// Compiled bytecode: the code bytes, the source line of every byte, and
/// the constant pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<u8>,
    /// `lines[i]` is the source line that produced `code[i]`.
    pub lines: Vec<usize>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    pub fn write(&mut self, byte: u8, line: usize) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: usize) {
        self.write(op.into(), line);
    }

    /// Appends to the constant pool and returns the new index. Callers that
    /// encode the index in an operand byte must check it fits.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Source line of the byte at `offset`, or 0 when out of range.
    pub fn line(&self, offset: usize) -> usize {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { chunk: self, offset: 0 }
    }

    /// Decodes the instruction starting at `offset`; `None` past the end.
    pub fn decode(&self, offset: usize) -> Option<Result<Instruction, DecodeError>> {
        let byte = *self.code.get(offset)?;
        let line = self.line(offset);

        let op = match OpCode::try_from(byte) {
            Ok(op) => op,
            Err(UnknownOpcode(byte)) => return Some(Err(DecodeError::UnknownOpcode { offset, byte })),
        };

        let operand = match op.operand_count() {
            0 => None,
            _ => match self.code.get(offset + 1) {
                Some(b) => Some(*b),
                None => return Some(Err(DecodeError::MissingOperand { offset, op })),
            },
        };
        Some(Ok(Instruction { offset, line, op, operand }))
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub offset: usize,
    pub line: usize,
    pub op: OpCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand: Option<u8>,
}

impl Instruction {
    /// Encoded size in bytes.
    pub fn width(&self) -> usize {
        1 + self.op.operand_count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },
    #[error("{op} at offset {offset} is missing its operand")]
    MissingOperand { offset: usize, op: OpCode },
}

impl DecodeError {
    pub fn offset(&self) -> usize {
        match self {
            DecodeError::UnknownOpcode { offset, .. } | DecodeError::MissingOperand { offset, .. } => {
                *offset
            }
        }
    }
}

/// Walks a chunk instruction by instruction. An unknown opcode byte is
/// reported and skipped; a truncated operand ends the walk.
pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoded = self.chunk.decode(self.offset)?;
        self.offset = match &decoded {
            Ok(instruction) => self.offset + instruction.width(),
            Err(DecodeError::UnknownOpcode { .. }) => self.offset + 1,
            Err(DecodeError::MissingOperand { .. }) => self.chunk.code.len(),
        };
        Some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_byte_conversion() {
        for op in OpCode::ALL {
            let byte: u8 = op.into();
            assert_eq!(OpCode::try_from(byte), Ok(op));
        }
        assert_eq!(OpCode::try_from(14), Err(UnknownOpcode(14)));
        assert_eq!(OpCode::try_from(255), Err(UnknownOpcode(255)));
    }

    #[test]
    fn opcode_mnemonic_parses_back() {
        for op in OpCode::ALL {
            assert_eq!(op.mnemonic().parse::<OpCode>(), Ok(op));
        }
        assert!("OP_JUMP".parse::<OpCode>().is_err());
    }

    #[test]
    fn write_keeps_lines_parallel() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.2));
        chunk.write_op(OpCode::Constant, 123);
        chunk.write(idx as u8, 123);
        chunk.write_op(OpCode::Return, 124);
        assert_eq!(chunk.code, vec![0, 0, 13]);
        assert_eq!(chunk.lines, vec![123, 123, 124]);
        assert_eq!(chunk.code.len(), chunk.lines.len());
        assert_eq!(chunk.line(2), 124);
        assert_eq!(chunk.line(99), 0);
    }

    #[test]
    fn add_constant_returns_sequential_indices() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 1);
        assert_eq!(chunk.add_constant(Value::Nil), 2);
        assert_eq!(chunk.constants.len(), 3);
    }

    #[test]
    fn instructions_decode_operands() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(0, 1);
        chunk.write_op(OpCode::Negate, 1);
        chunk.write_op(OpCode::Return, 2);

        let decoded: Vec<Instruction> = chunk.instructions().map(|i| i.unwrap()).collect();
        assert_eq!(
            decoded,
            vec![
                Instruction { offset: 0, line: 1, op: OpCode::Constant, operand: Some(0) },
                Instruction { offset: 2, line: 1, op: OpCode::Negate, operand: None },
                Instruction { offset: 3, line: 2, op: OpCode::Return, operand: None },
            ]
        );
    }

    #[test]
    fn instructions_skip_unknown_bytes() {
        let mut chunk = Chunk::new();
        chunk.write(200, 1);
        chunk.write_op(OpCode::Return, 1);
        let decoded: Vec<_> = chunk.instructions().collect();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], Err(DecodeError::UnknownOpcode { offset: 0, byte: 200 }));
        assert_eq!(decoded[1].as_ref().map(|i| i.op), Ok(OpCode::Return));
    }

    #[test]
    fn instructions_stop_on_truncated_operand() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 3);
        let decoded: Vec<_> = chunk.instructions().collect();
        assert_eq!(decoded, vec![Err(DecodeError::MissingOperand { offset: 0, op: OpCode::Constant })]);
        assert_eq!(decoded[0].as_ref().unwrap_err().offset(), 0);
    }
}
