use serde::{Deserialize, Serialize};

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// A single bytecode instruction.
///
/// Branch offsets are instruction-count deltas, applied on top of the
/// dispatch loop's normal post-instruction increment: `Branch(0)` is a
/// no-op fallthrough, `Branch(1)` skips the next instruction, and
/// `Branch(-2)` re-executes the branch's predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Push a literal number.
    PushNum(f32),

    /// Push the value of a local slot.
    LoadLocal(u32),

    /// Pop a value and store it into a local slot, growing the frame's
    /// locals if needed.
    StoreLocal(u32),

    /// Pop rhs, pop lhs, push `lhs OP rhs`.
    Math(MathOp),

    /// Return from the current frame. With no frame to return to, the top
    /// of the data stack becomes the program result.
    Return,

    /// Invoke the function at the given index in the function table.
    Call(u32),

    /// Unconditional relative jump.
    Branch(i32),

    /// Pop a condition; jump by the first offset if it is nonzero, by the
    /// second otherwise.
    CondBranch(i16, i16),
}

impl Op {
    /// Opcode tag used by the binary encoding (spans 1-8).
    pub fn tag(&self) -> u8 {
        match self {
            Op::PushNum(_) => 1,
            Op::LoadLocal(_) => 2,
            Op::StoreLocal(_) => 3,
            Op::Math(_) => 4,
            Op::Return => 5,
            Op::Call(_) => 6,
            Op::Branch(_) => 7,
            Op::CondBranch(_, _) => 8,
        }
    }
}

// =============================================================================
// MATH OP - the 13 binary operators
// =============================================================================

/// Arithmetic, comparison and boolean operators.
///
/// There is no boolean type: comparison and boolean operators produce
/// `1.0` / `0.0`, and consume any nonzero value as true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
    Exp,
    Gt,
    Lt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl MathOp {
    /// Operator id used by the binary encoding (spans 1-13).
    pub fn id(self) -> u32 {
        match self {
            MathOp::Add => 1,
            MathOp::Sub => 2,
            MathOp::Mul => 3,
            MathOp::Div => 4,
            MathOp::Exp => 5,
            MathOp::Gt => 6,
            MathOp::Lt => 7,
            MathOp::Le => 8,
            MathOp::Ge => 9,
            MathOp::Eq => 10,
            MathOp::Ne => 11,
            MathOp::And => 12,
            MathOp::Or => 13,
        }
    }

    /// Inverse of `id`, for the bytecode decoder.
    pub fn from_id(id: u32) -> Option<MathOp> {
        Some(match id {
            1 => MathOp::Add,
            2 => MathOp::Sub,
            3 => MathOp::Mul,
            4 => MathOp::Div,
            5 => MathOp::Exp,
            6 => MathOp::Gt,
            7 => MathOp::Lt,
            8 => MathOp::Le,
            9 => MathOp::Ge,
            10 => MathOp::Eq,
            11 => MathOp::Ne,
            12 => MathOp::And,
            13 => MathOp::Or,
            _ => return None,
        })
    }

    /// Source-level spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
            MathOp::Exp => "^",
            MathOp::Gt => ">",
            MathOp::Lt => "<",
            MathOp::Le => "<=",
            MathOp::Ge => ">=",
            MathOp::Eq => "==",
            MathOp::Ne => "!=",
            MathOp::And => "&&",
            MathOp::Or => "||",
        }
    }

    /// Disassembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            MathOp::Add => "OP_ADD",
            MathOp::Sub => "OP_SUB",
            MathOp::Mul => "OP_MUL",
            MathOp::Div => "OP_DIV",
            MathOp::Exp => "OP_EXP",
            MathOp::Gt => "OP_GT",
            MathOp::Lt => "OP_LT",
            MathOp::Le => "OP_LTE",
            MathOp::Ge => "OP_GTE",
            MathOp::Eq => "OP_EQ",
            MathOp::Ne => "OP_NE",
            MathOp::And => "OP_AND",
            MathOp::Or => "OP_OR",
        }
    }

    /// Applies the operator. Division by zero follows native float
    /// semantics (infinities / NaN), not an error.
    pub fn apply(self, lhs: f32, rhs: f32) -> f32 {
        fn bool_to_num(b: bool) -> f32 {
            if b { 1.0 } else { 0.0 }
        }

        match self {
            MathOp::Add => lhs + rhs,
            MathOp::Sub => lhs - rhs,
            MathOp::Mul => lhs * rhs,
            MathOp::Div => lhs / rhs,
            MathOp::Exp => lhs.powf(rhs),
            MathOp::Gt => bool_to_num(lhs > rhs),
            MathOp::Lt => bool_to_num(lhs < rhs),
            MathOp::Le => bool_to_num(lhs <= rhs),
            MathOp::Ge => bool_to_num(lhs >= rhs),
            MathOp::Eq => bool_to_num(lhs == rhs),
            MathOp::Ne => bool_to_num(lhs != rhs),
            MathOp::And => bool_to_num(lhs != 0.0 && rhs != 0.0),
            MathOp::Or => bool_to_num(lhs != 0.0 || rhs != 0.0),
        }
    }
}

impl std::fmt::Display for MathOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
