use std::fmt::Write;

use serde_json::json;

use crate::chunk::{Chunk, DecodeError};

/// Renders a whole chunk as a listing headed by `== name ==`, one
/// instruction per line.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {name} ==\n");
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Renders the instruction at `offset` and returns it with the offset of
/// the next instruction.
///
/// The line column shows `|` when the instruction came from the same source
/// line as the byte before it.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{offset:04} ");
    if offset > 0 && chunk.line(offset) == chunk.line(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line(offset));
    }

    let next = match chunk.decode(offset) {
        Some(Ok(instruction)) => {
            match instruction.operand {
                Some(index) => {
                    let value = match chunk.constants.get(index as usize) {
                        Some(value) => value.to_string(),
                        None => "<bad constant>".to_string(),
                    };
                    let _ = write!(out, "{:<16} {:4} '{}'", instruction.op.mnemonic(), index, value);
                }
                None => out.push_str(instruction.op.mnemonic()),
            }
            offset + instruction.width()
        }
        Some(Err(DecodeError::UnknownOpcode { byte, .. })) => {
            let _ = write!(out, "Unknown opcode {byte}");
            offset + 1
        }
        Some(Err(DecodeError::MissingOperand { op, .. })) => {
            let _ = write!(out, "{:<16} <missing operand>", op.mnemonic());
            chunk.len()
        }
        None => {
            out.push_str("<end of chunk>");
            offset + 1
        }
    };
    (out, next)
}

/// Machine-readable form of the listing.
pub fn to_json(chunk: &Chunk, name: &str) -> serde_json::Value {
    let instructions: Vec<serde_json::Value> = chunk
        .instructions()
        .map(|decoded| match decoded {
            Ok(instruction) => {
                let mut obj = serde_json::to_value(instruction).unwrap_or(serde_json::Value::Null);
                if let Some(value) = instruction
                    .operand
                    .and_then(|index| chunk.constants.get(index as usize))
                {
                    obj["value"] = json!(value.to_string());
                }
                obj
            }
            Err(e) => json!({
                "offset": e.offset(),
                "error": e.to_string(),
            }),
        })
        .collect();

    let constants: Vec<String> = chunk.constants.iter().map(ToString::to_string).collect();

    json!({
        "name": name,
        "constants": constants,
        "instructions": instructions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::OpCode;
    use crate::value::Value;

    fn sample() -> Chunk {
        // 1 +
        // 2
        let mut chunk = Chunk::new();
        let a = chunk.add_constant(Value::Number(1.0));
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(a as u8, 1);
        let b = chunk.add_constant(Value::Number(2.0));
        chunk.write_op(OpCode::Constant, 2);
        chunk.write(b as u8, 2);
        chunk.write_op(OpCode::Add, 2);
        chunk.write_op(OpCode::Return, 2);
        chunk
    }

    #[test]
    fn listing_format() {
        let listing = disassemble_chunk(&sample(), "code");
        let expected = "\
== code ==
0000    1 OP_CONSTANT         0 '1'
0002    2 OP_CONSTANT         1 '2'
0004    | OP_ADD
0005    | OP_RETURN
";
        assert_eq!(listing, expected);
    }

    #[test]
    fn instruction_returns_next_offset() {
        let chunk = sample();
        assert_eq!(disassemble_instruction(&chunk, 0).1, 2);
        assert_eq!(disassemble_instruction(&chunk, 4).1, 5);
    }

    #[test]
    fn unknown_byte_is_listed_and_skipped() {
        let mut chunk = Chunk::new();
        chunk.write(99, 7);
        chunk.write_op(OpCode::Return, 7);
        let listing = disassemble_chunk(&chunk, "bad");
        assert!(listing.contains("0000    7 Unknown opcode 99"));
        assert!(listing.contains("0001    | OP_RETURN"));
    }

    #[test]
    fn missing_operand_ends_listing() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        let (text, next) = disassemble_instruction(&chunk, 0);
        assert!(text.ends_with("<missing operand>"));
        assert_eq!(next, 1);
    }

    #[test]
    fn bad_constant_index_is_marked() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(5, 1);
        let (text, _) = disassemble_instruction(&chunk, 0);
        assert!(text.ends_with("'<bad constant>'"));
    }

    #[test]
    fn listing_parses_back_to_instructions() {
        let chunk = sample();
        let listing = disassemble_chunk(&chunk, "code");

        let parsed: Vec<(usize, OpCode, Option<u8>)> = listing
            .lines()
            .skip(1)
            .map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                let offset = fields[0].parse().unwrap();
                let op = fields[2].parse().unwrap();
                let operand = fields.get(3).map(|s| s.parse().unwrap());
                (offset, op, operand)
            })
            .collect();

        let decoded: Vec<(usize, OpCode, Option<u8>)> = chunk
            .instructions()
            .map(|i| i.unwrap())
            .map(|i| (i.offset, i.op, i.operand))
            .collect();
        assert_eq!(parsed, decoded);
    }

    #[test]
    fn json_shape() {
        let doc = to_json(&sample(), "code");
        assert_eq!(doc["name"], "code");
        assert_eq!(doc["constants"], json!(["1", "2"]));
        let instructions = doc["instructions"].as_array().unwrap();
        assert_eq!(instructions.len(), 4);
        assert_eq!(instructions[0]["op"], "CONSTANT");
        assert_eq!(instructions[0]["operand"], 0);
        assert_eq!(instructions[0]["value"], "1");
        assert_eq!(instructions[2]["op"], "ADD");
        assert!(instructions[2].get("operand").is_none());
        assert_eq!(instructions[3]["line"], 2);
    }
}
