use crate::bytecode::{Op, ProgramBc};

/// Column the first operand starts in. Mnemonics are padded to this width.
const MNEMONIC_WIDTH: usize = 15;

fn pad(mnemonic: &str) -> String {
    format!("{:<width$}", mnemonic, width = MNEMONIC_WIDTH)
}

/// Formats one instruction: mnemonic padded to 15 columns, operands
/// space-separated. Operand-less instructions print the bare mnemonic.
pub fn format_op(op: &Op) -> String {
    match *op {
        Op::PushNum(value) => format!("{}{}", pad("PUSH_NUM"), value),
        Op::LoadLocal(slot) => format!("{}{}", pad("LOAD_LOCAL"), slot),
        Op::StoreLocal(slot) => format!("{}{}", pad("STORE_LOCAL"), slot),
        Op::Math(op) => op.mnemonic().to_string(),
        Op::Return => "RETURN".to_string(),
        Op::Call(function) => format!("{}{}", pad("CALL"), function),
        Op::Branch(offset) => format!("{}{}", pad("BRANCH"), offset),
        Op::CondBranch(true_offset, false_offset) => {
            format!("{}{} {}", pad("COND_BRANCH"), true_offset, false_offset)
        }
    }
}

/// Formats an instruction sequence, one line per instruction.
pub fn format_ops(ops: &[Op]) -> String {
    ops.iter()
        .map(format_op)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats a whole program: each function's listing in index order, then
/// the main body, blank-line separated.
pub fn format_program(bc: &ProgramBc) -> String {
    let mut listings: Vec<String> = bc
        .functions
        .iter()
        .map(|ops| format_ops(ops))
        .collect();
    listings.push(format_ops(&bc.main));
    listings.join("\n\n")
}

/// Prints the disassembly of a program to stdout.
pub fn print_bc(bc: &ProgramBc) {
    println!("{}", format_program(bc));
}
