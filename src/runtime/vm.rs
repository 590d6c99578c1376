use crate::bytecode::{Op, ProgramBc};
use crate::runtime::runtime_error::RuntimeError;

/// One suspended invocation, pushed by `Call` and popped by `Return`.
/// Carries everything needed to resume the caller: its code sequence, the
/// instruction after the call, and its locals.
struct Frame<'p> {
    code: &'p [Op],
    ret_ip: usize,
    saved_locals: Vec<Option<f32>>,
}

/// Stack-based bytecode interpreter.
///
/// The data stack is shared across frames (that is how arguments and return
/// values travel); the locals array belongs to the current frame only and is
/// fully replaced on each call and return, keeping frames isolated.
///
/// A slot holds `None` until the first `StoreLocal` writes it; reading a
/// `None` (or out-of-bounds) slot is a fatal `UninitializedSlot` error.
pub struct Vm {
    stack: Vec<f32>,
    locals: Vec<Option<f32>>,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            stack: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// The data stack. After `run` returns, this holds whatever values were
    /// left behind below the returned result.
    #[allow(dead_code)]
    pub fn stack(&self) -> &[f32] {
        &self.stack
    }

    /// Reads a local slot of the innermost frame (after `run`, the main
    /// frame). Returns `None` for unwritten slots.
    #[allow(dead_code)]
    pub fn local(&self, slot: u32) -> Option<f32> {
        self.locals.get(slot as usize).copied().flatten()
    }

    fn pop(&mut self) -> Result<f32, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Executes a compiled program to completion and returns its result:
    /// the value popped by the `Return` that empties the call stack.
    ///
    /// The program is immutable and may be run any number of times; each
    /// run starts from fresh data/locals/call stacks.
    pub fn run(&mut self, prog: &ProgramBc) -> Result<f32, RuntimeError> {
        self.stack.clear();
        self.locals.clear();

        let mut code: &[Op] = &prog.main;
        let mut ip: usize = 0;
        let mut frames: Vec<Frame> = Vec::new();

        loop {
            let op = *code.get(ip).ok_or(RuntimeError::IpOutOfRange)?;

            match op {
                Op::PushNum(value) => {
                    self.stack.push(value);
                    ip += 1;
                }

                Op::LoadLocal(slot) => {
                    let value = self
                        .locals
                        .get(slot as usize)
                        .copied()
                        .flatten()
                        .ok_or(RuntimeError::UninitializedSlot(slot))?;
                    self.stack.push(value);
                    ip += 1;
                }

                Op::StoreLocal(slot) => {
                    let value = self.pop()?;
                    let index = slot as usize;
                    if index >= self.locals.len() {
                        self.locals.resize(index + 1, None);
                    }
                    self.locals[index] = Some(value);
                    ip += 1;
                }

                Op::Math(op) => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.stack.push(op.apply(lhs, rhs));
                    ip += 1;
                }

                Op::Return => match frames.pop() {
                    // Empty call stack: the top of the data stack is the
                    // program's final result.
                    None => return self.pop(),
                    // Otherwise the return value stays on the data stack
                    // (pushed once by the callee, consumed once by the
                    // caller); only the frame is restored.
                    Some(frame) => {
                        self.locals = frame.saved_locals;
                        code = frame.code;
                        ip = frame.ret_ip;
                    }
                },

                Op::Call(function) => {
                    let body: &[Op] = prog
                        .functions
                        .get(function as usize)
                        .ok_or(RuntimeError::UndefinedFunction(function))?;
                    frames.push(Frame {
                        code,
                        ret_ip: ip + 1,
                        saved_locals: std::mem::take(&mut self.locals),
                    });
                    code = body;
                    ip = 0;
                }

                Op::Branch(offset) => {
                    ip = branch_target(ip, offset)?;
                }

                Op::CondBranch(true_offset, false_offset) => {
                    let cond = self.pop()?;
                    let offset = if cond != 0.0 { true_offset } else { false_offset };
                    ip = branch_target(ip, offset as i32)?;
                }
            }
        }
    }
}

/// Relative jumps combine with the loop's normal post-instruction
/// increment: the offset is applied as if the pointer had already advanced
/// past the branch. `Branch(0)` is a plain fallthrough.
fn branch_target(ip: usize, offset: i32) -> Result<usize, RuntimeError> {
    let target = ip as i64 + 1 + offset as i64;
    if target < 0 {
        Err(RuntimeError::IpOutOfRange)
    } else {
        Ok(target as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::resolve::resolve;
    use crate::bytecode::{MathOp, compile::compile};
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    /// Full pipeline: source -> tokens -> AST -> resolved -> bytecode.
    fn compile_source(source: &str) -> ProgramBc {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize().expect("lexing should succeed");
        let program = Parser::new(tokens).parse().expect("parsing should succeed");
        compile(&resolve(&program).expect("resolution should succeed"))
    }

    fn run_source(source: &str) -> Result<f32, RuntimeError> {
        Vm::new().run(&compile_source(source))
    }

    fn run_ops(main: Vec<Op>) -> Result<f32, RuntimeError> {
        Vm::new().run(&ProgramBc {
            main,
            functions: vec![],
        })
    }

    #[test]
    fn test_literal_return() {
        assert_eq!(run_source("return 42"), Ok(42.0));
    }

    #[test]
    fn test_arithmetic_expressions() {
        assert_eq!(run_source("4 + 12.5 * 3 - 18"), Ok(23.5));
        assert_eq!(run_source("a = 2; b = 2; c = 2; a^b^c"), Ok(16.0));
        let hypotenuse = run_source("(3^2 + 4^2)^(1/2)").unwrap();
        assert!((hypotenuse - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_if_true_takes_then_branch() {
        assert_eq!(
            run_source("if 1 { return 2; } else { return 3; }"),
            Ok(2.0)
        );
    }

    #[test]
    fn test_if_false_takes_else_branch() {
        assert_eq!(
            run_source("if 0 { return 2; } else { return 3; }"),
            Ok(3.0)
        );
    }

    #[test]
    fn test_any_nonzero_condition_is_true() {
        assert_eq!(
            run_source("if 0 - 1 { return 7 } else { return 8 }"),
            Ok(7.0)
        );
    }

    #[test]
    fn test_if_without_else_falls_through() {
        assert_eq!(run_source("a = 1; if 0 { a = 2 } a"), Ok(1.0));
        assert_eq!(run_source("a = 1; if 1 { a = 2 } a"), Ok(2.0));
    }

    #[test]
    fn test_else_if_chain() {
        let source = "x = 2\n\
                      if x == 1 { return 10 }\n\
                      else if x == 2 { return 20 }\n\
                      else { return 30 }";
        assert_eq!(run_source(source), Ok(20.0));
    }

    #[test]
    fn test_call_with_implicit_main_return() {
        assert_eq!(
            run_source("fn add(a, b) { return a + b; } add(2, 3)"),
            Ok(5.0)
        );
    }

    #[test]
    fn test_slot_assignment_chain() {
        let bc = compile_source("a = 1; b = a - 2; c = a * b");
        let mut vm = Vm::new();
        // last statement is an assignment, so main returns zero
        assert_eq!(vm.run(&bc), Ok(0.0));
        assert_eq!(vm.local(0), Some(1.0));
        assert_eq!(vm.local(1), Some(-1.0));
        assert_eq!(vm.local(2), Some(-1.0));
    }

    #[test]
    fn test_frame_locals_are_isolated() {
        // f's locals land in its own frame; the caller's slot 0 survives.
        assert_eq!(
            run_source("fn f(x) { y = 99; return x } a = 5; f(1) + a"),
            Ok(6.0)
        );
    }

    #[test]
    fn test_nested_calls() {
        let source = "fn double(n) { return n * 2 }\n\
                      fn quad(n) { return double(double(n)) }\n\
                      quad(3)";
        assert_eq!(run_source(source), Ok(12.0));
    }

    #[test]
    fn test_recursion() {
        let source = "fn fact(n) { if n <= 1 { return 1 } return n * fact(n - 1) }\n\
                      fact(5)";
        assert_eq!(run_source(source), Ok(120.0));
    }

    #[test]
    fn test_mutual_recursion() {
        let source = "fn is_even(n) { if n == 0 { return 1 } return is_odd(n - 1) }\n\
                      fn is_odd(n) { if n == 0 { return 0 } return is_even(n - 1) }\n\
                      is_even(4)";
        assert_eq!(run_source(source), Ok(1.0));
    }

    #[test]
    fn test_function_implicit_zero_return() {
        assert_eq!(run_source("fn side(x) { y = x * 2 } side(3)"), Ok(0.0));
    }

    #[test]
    fn test_boolean_operators_end_to_end() {
        assert_eq!(run_source("1 < 2 && 3 != 4"), Ok(1.0));
        assert_eq!(run_source("1 > 2 || 0"), Ok(0.0));
    }

    #[test]
    fn test_division_by_zero_is_native_float() {
        assert_eq!(run_source("1 / 0"), Ok(f32::INFINITY));
        assert!(run_source("0 / 0").unwrap().is_nan());
    }

    #[test]
    fn test_program_is_reusable() {
        let bc = compile_source("fn sq(n) { return n * n } sq(7)");
        assert_eq!(Vm::new().run(&bc), Ok(49.0));
        assert_eq!(Vm::new().run(&bc), Ok(49.0));
        // and the same VM can run it again from fresh stacks
        let mut vm = Vm::new();
        assert_eq!(vm.run(&bc), Ok(49.0));
        assert_eq!(vm.run(&bc), Ok(49.0));
    }

    #[test]
    fn test_branch_skips_instructions() {
        let result = run_ops(vec![
            Op::PushNum(1.0),
            Op::Branch(1),
            Op::PushNum(99.0),
            Op::Return,
        ]);
        assert_eq!(result, Ok(1.0));
    }

    #[test]
    fn test_stack_underflow() {
        assert_eq!(run_ops(vec![Op::Return]), Err(RuntimeError::StackUnderflow));
        assert_eq!(
            run_ops(vec![Op::PushNum(1.0), Op::Math(MathOp::Add)]),
            Err(RuntimeError::StackUnderflow)
        );
    }

    #[test]
    fn test_uninitialized_slot_read() {
        assert_eq!(
            run_ops(vec![Op::LoadLocal(0), Op::Return]),
            Err(RuntimeError::UninitializedSlot(0))
        );
        // a high store grows the array with filler; the filler slots still
        // count as never written
        assert_eq!(
            run_ops(vec![
                Op::PushNum(1.0),
                Op::StoreLocal(2),
                Op::LoadLocal(0),
                Op::Return,
            ]),
            Err(RuntimeError::UninitializedSlot(0))
        );
    }

    #[test]
    fn test_call_out_of_range() {
        assert_eq!(
            run_ops(vec![Op::Call(0), Op::Return]),
            Err(RuntimeError::UndefinedFunction(0))
        );
    }

    #[test]
    fn test_falling_off_the_end() {
        assert_eq!(
            run_ops(vec![Op::PushNum(1.0)]),
            Err(RuntimeError::IpOutOfRange)
        );
    }

    #[test]
    fn test_leftover_values_stay_below_result() {
        let bc = compile_source("1; 2; 3");
        let mut vm = Vm::new();
        assert_eq!(vm.run(&bc), Ok(3.0));
        // the two earlier expression statements left their values behind
        assert_eq!(vm.stack(), &[1.0, 2.0]);
    }
}
