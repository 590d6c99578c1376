pub mod compile;
pub mod disasm;
pub mod encode;
pub mod ir;
pub mod op;
pub mod resolve;
pub mod resolve_error;

pub use ir::ProgramBc;
pub use op::{MathOp, Op};
