use crate::bytecode::MathOp;

/// Abstract syntax tree node as produced by the parser.
///
/// Names are still textual at this stage; the resolver turns them into
/// slot and function indices (see `bytecode::resolve`).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Numeric literal.
    Num(f32),

    /// Variable read.
    Ident(String),

    /// Binary operation on two expressions.
    BinOp {
        lhs: Box<Node>,
        op: MathOp,
        rhs: Box<Node>,
    },

    /// `name = expr`. Declares `name` on first assignment, updates it after.
    Assign { name: String, value: Box<Node> },

    /// `return expr`.
    Return(Box<Node>),

    /// `fn name(params) { body }`.
    Fn {
        name: String,
        params: Vec<String>,
        body: Vec<Node>,
    },

    /// `name(args)`.
    Call { name: String, args: Vec<Node> },

    /// `if cond { ... } else { ... }`. An `else if` chain nests another
    /// `IfElse` as the sole statement of `else_block`.
    IfElse {
        cond: Box<Node>,
        then_block: Vec<Node>,
        else_block: Option<Vec<Node>>,
    },
}

/// A parsed program: the ordered top-level statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Node>,
}
