use crate::bytecode::resolve::{Expr, Function, ResolvedProgram, Stmt};
use crate::bytecode::{Op, ProgramBc};

/// Converts a resolved program into bytecode.
///
/// Code generation is total: every failure mode belongs to the resolver, so
/// this pass returns plain values. Emission is post-order (children before
/// the operator that consumes them), the stack-machine RPN order:
/// `(1 + 1) * 2` becomes `1 1 + 2 *`.
pub fn compile(program: &ResolvedProgram) -> ProgramBc {
    let functions = program.functions.iter().map(compile_function).collect();
    ProgramBc {
        main: compile_main(&program.main),
        functions,
    }
}

/// Compiles the top-level statement list.
///
/// Main gets an implicit return: when the last statement is a bare
/// expression, its value is still on the data stack and a lone `Return`
/// makes it the program result. Otherwise main returns zero, like a
/// function body that falls off the end.
fn compile_main(stmts: &[Stmt]) -> Vec<Op> {
    let mut ops = Vec::new();
    for stmt in stmts {
        compile_stmt(stmt, &mut ops);
    }

    if !matches!(ops.last(), Some(Op::Return)) {
        if !matches!(stmts.last(), Some(Stmt::Expr(_))) {
            ops.push(Op::PushNum(0.0));
        }
        ops.push(Op::Return);
    }
    ops
}

/// Compiles one function body.
///
/// Arguments arrive on the data stack in left-to-right push order, so they
/// are popped and stored back-to-front to land in slots `0..params`. A body
/// whose last instruction is not a `Return` gets an implicit zero-return.
fn compile_function(function: &Function) -> Vec<Op> {
    let mut ops = Vec::new();
    for slot in (0..function.params).rev() {
        ops.push(Op::StoreLocal(slot));
    }
    for stmt in &function.body {
        compile_stmt(stmt, &mut ops);
    }
    if !matches!(ops.last(), Some(Op::Return)) {
        ops.push(Op::PushNum(0.0));
        ops.push(Op::Return);
    }
    ops
}

fn compile_stmt(stmt: &Stmt, ops: &mut Vec<Op>) {
    match stmt {
        Stmt::Expr(expr) => compile_expr(expr, ops),

        Stmt::Assign { slot, value } => {
            compile_expr(value, ops);
            ops.push(Op::StoreLocal(*slot));
        }

        Stmt::Return(value) => {
            compile_expr(value, ops);
            ops.push(Op::Return);
        }

        // Layout: [cond] [CondBranch(0, len(then))] [then] [Branch(len(else))] [else]
        //
        // A true condition falls through into the then-block; a false one
        // jumps straight past it to the else-block. The trailing Branch
        // skips the else-block when the then-block falls through its end;
        // with no else-block it is a Branch(0) no-op.
        Stmt::IfElse {
            cond,
            then_block,
            else_block,
        } => {
            compile_expr(cond, ops);

            let mut then_ops = Vec::new();
            for stmt in then_block {
                compile_stmt(stmt, &mut then_ops);
            }
            let mut else_ops = Vec::new();
            for stmt in else_block {
                compile_stmt(stmt, &mut else_ops);
            }

            then_ops.push(Op::Branch(else_ops.len() as i32));
            ops.push(Op::CondBranch(0, then_ops.len() as i16));
            ops.extend(then_ops);
            ops.extend(else_ops);
        }
    }
}

fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
    match expr {
        Expr::Num(value) => ops.push(Op::PushNum(*value)),

        Expr::Local(slot) => ops.push(Op::LoadLocal(*slot)),

        Expr::BinOp { lhs, op, rhs } => {
            compile_expr(lhs, ops);
            compile_expr(rhs, ops);
            ops.push(Op::Math(*op));
        }

        Expr::Call { function, args } => {
            for arg in args {
                compile_expr(arg, ops);
            }
            ops.push(Op::Call(*function));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::MathOp;
    use crate::bytecode::resolve::resolve;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn compile_source(source: &str) -> ProgramBc {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize().expect("lexing should succeed");
        let program = Parser::new(tokens).parse().expect("parsing should succeed");
        compile(&resolve(&program).expect("resolution should succeed"))
    }

    #[test]
    fn test_expression_is_rpn() {
        // (1 + 1) * 2  ->  1 1 + 2 *
        let bc = compile_source("(1 + 1) * 2");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(1.0),
                Op::PushNum(1.0),
                Op::Math(MathOp::Add),
                Op::PushNum(2.0),
                Op::Math(MathOp::Mul),
                Op::Return,
            ]
        );
    }

    #[test]
    fn test_assignment_stores_after_value() {
        let bc = compile_source("a = 1 + 2");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(1.0),
                Op::PushNum(2.0),
                Op::Math(MathOp::Add),
                Op::StoreLocal(0),
                Op::PushNum(0.0),
                Op::Return,
            ]
        );
    }

    #[test]
    fn test_explicit_return_gets_no_implicit_one() {
        let bc = compile_source("return 5");
        assert_eq!(bc.main, vec![Op::PushNum(5.0), Op::Return]);
    }

    #[test]
    fn test_main_trailing_expression_is_the_result() {
        let bc = compile_source("a = 2; a * 3");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(2.0),
                Op::StoreLocal(0),
                Op::LoadLocal(0),
                Op::PushNum(3.0),
                Op::Math(MathOp::Mul),
                Op::Return,
            ]
        );
    }

    #[test]
    fn test_empty_main_returns_zero() {
        let bc = compile_source("");
        assert_eq!(bc.main, vec![Op::PushNum(0.0), Op::Return]);
    }

    #[test]
    fn test_if_else_layout() {
        // [cond] [CondBranch(0, len(then))] [then] [Branch(len(else))] [else]
        let bc = compile_source("if 1 { return 2; } else { return 3; }");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(1.0),
                Op::CondBranch(0, 3), // then = return 2 (2 ops) + Branch
                Op::PushNum(2.0),
                Op::Return,
                Op::Branch(2), // skip the else-block
                Op::PushNum(3.0),
                Op::Return,
                // the else-block ends in Return, so no implicit return is
                // appended after the IfElse
            ]
        );
    }

    #[test]
    fn test_if_without_else_gets_noop_branch() {
        let bc = compile_source("a = 0; if 1 { a = 2 }");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(0.0),
                Op::StoreLocal(0),
                Op::PushNum(1.0),
                Op::CondBranch(0, 3),
                Op::PushNum(2.0),
                Op::StoreLocal(0),
                Op::Branch(0), // empty else: fallthrough no-op
                Op::PushNum(0.0),
                Op::Return,
            ]
        );
    }

    #[test]
    fn test_function_parameters_stored_in_reverse() {
        let bc = compile_source("fn add(a, b) { return a + b; }");
        assert_eq!(
            bc.functions,
            vec![vec![
                Op::StoreLocal(1),
                Op::StoreLocal(0),
                Op::LoadLocal(0),
                Op::LoadLocal(1),
                Op::Math(MathOp::Add),
                Op::Return,
            ]]
        );
    }

    #[test]
    fn test_function_implicit_zero_return() {
        let bc = compile_source("fn store(x) { y = x }");
        assert_eq!(
            bc.functions,
            vec![vec![
                Op::StoreLocal(0),
                Op::LoadLocal(0),
                Op::StoreLocal(1),
                Op::PushNum(0.0),
                Op::Return,
            ]]
        );
    }

    #[test]
    fn test_empty_function_body() {
        let bc = compile_source("fn nop() {}");
        assert_eq!(bc.functions, vec![vec![Op::PushNum(0.0), Op::Return]]);
    }

    #[test]
    fn test_call_arguments_in_order() {
        let bc = compile_source("fn add(a, b) { return a + b; } add(2, 3)");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(2.0),
                Op::PushNum(3.0),
                Op::Call(0),
                Op::Return,
            ]
        );
    }

    #[test]
    fn test_nested_if_offsets() {
        let bc = compile_source("if 1 { if 0 { return 1 } } else { return 2 }");
        assert_eq!(
            bc.main,
            vec![
                Op::PushNum(1.0),
                Op::CondBranch(0, 6), // outer then: 5 inner ops + Branch
                Op::PushNum(0.0),
                Op::CondBranch(0, 3), // inner then: return 1 + Branch(0)
                Op::PushNum(1.0),
                Op::Return,
                Op::Branch(0),
                Op::Branch(2), // skip outer else
                Op::PushNum(2.0),
                Op::Return,
            ]
        );
    }
}
