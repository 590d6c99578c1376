use crate::bytecode::{MathOp, Op};

// =============================================================================
// Binary encoding
// =============================================================================
//
// Fixed little-endian format, one record per instruction: a 1-byte opcode
// tag followed by a fixed-size operand. Every record is 5 bytes: a 32-bit
// operand for tags 1-7 (RETURN carries an unused zero), and two 16-bit
// offsets for COND_BRANCH. A serialized sequence is the raw concatenation
// of records with no header or length prefix.

/// An error raised while decoding a bytecode stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// A record started with a tag outside 1-8.
    UnknownOpcode { tag: u8, offset: usize },

    /// A MATH_OP record carried an operator id outside 1-13.
    UnknownOperator { id: u32, offset: usize },

    /// The stream ended in the middle of a record.
    Truncated { offset: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnknownOpcode { tag, offset } => {
                write!(f, "decode error: unknown opcode tag {} at byte {}", tag, offset)
            }
            DecodeError::UnknownOperator { id, offset } => {
                write!(f, "decode error: unknown operator id {} at byte {}", id, offset)
            }
            DecodeError::Truncated { offset } => {
                write!(f, "decode error: truncated instruction at byte {}", offset)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Appends one instruction's record to `out`.
pub fn encode_op(op: &Op, out: &mut Vec<u8>) {
    out.push(op.tag());
    match *op {
        Op::PushNum(value) => out.extend_from_slice(&value.to_le_bytes()),
        Op::LoadLocal(slot) => out.extend_from_slice(&slot.to_le_bytes()),
        Op::StoreLocal(slot) => out.extend_from_slice(&slot.to_le_bytes()),
        Op::Math(op) => out.extend_from_slice(&op.id().to_le_bytes()),
        Op::Return => out.extend_from_slice(&0u32.to_le_bytes()),
        Op::Call(function) => out.extend_from_slice(&function.to_le_bytes()),
        Op::Branch(offset) => out.extend_from_slice(&offset.to_le_bytes()),
        Op::CondBranch(true_offset, false_offset) => {
            out.extend_from_slice(&true_offset.to_le_bytes());
            out.extend_from_slice(&false_offset.to_le_bytes());
        }
    }
}

/// Encodes an instruction sequence as a raw byte stream.
pub fn encode_ops(ops: &[Op]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ops.len() * 5);
    for op in ops {
        encode_op(op, &mut out);
    }
    out
}

/// Decodes a raw byte stream back into an instruction sequence.
/// Exact inverse of `encode_ops`.
#[allow(dead_code)]
pub fn decode_ops(bytes: &[u8]) -> Result<Vec<Op>, DecodeError> {
    let mut ops = Vec::with_capacity(bytes.len() / 5);
    let mut offset = 0;

    while offset < bytes.len() {
        let record_start = offset;
        let tag = bytes[offset];
        offset += 1;

        let operand = bytes
            .get(offset..offset + 4)
            .ok_or(DecodeError::Truncated {
                offset: record_start,
            })?;
        offset += 4;

        let word = u32::from_le_bytes([operand[0], operand[1], operand[2], operand[3]]);

        let op = match tag {
            1 => Op::PushNum(f32::from_le_bytes([
                operand[0], operand[1], operand[2], operand[3],
            ])),
            2 => Op::LoadLocal(word),
            3 => Op::StoreLocal(word),
            4 => Op::Math(MathOp::from_id(word).ok_or(DecodeError::UnknownOperator {
                id: word,
                offset: record_start,
            })?),
            5 => Op::Return,
            6 => Op::Call(word),
            7 => Op::Branch(word as i32),
            8 => Op::CondBranch(
                i16::from_le_bytes([operand[0], operand[1]]),
                i16::from_le_bytes([operand[2], operand[3]]),
            ),
            tag => {
                return Err(DecodeError::UnknownOpcode {
                    tag,
                    offset: record_start,
                });
            }
        };
        ops.push(op);
    }

    Ok(ops)
}
