use std::collections::HashMap;

use crate::ast::{Node, Program};
use crate::bytecode::MathOp;
use crate::bytecode::resolve_error::ResolveError;

// =============================================================================
// Resolved tree
// =============================================================================
//
// Resolution does not mutate the parsed AST; it produces a new tree in which
// every name has been replaced by an integer index. Function declarations are
// lifted out of the statement stream into `ResolvedProgram::functions`, so
// the code generator never sees one and cannot fail.

/// Expression with every name replaced by a slot or function index.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f32),
    /// Read of a local slot in the current frame.
    Local(u32),
    BinOp {
        lhs: Box<Expr>,
        op: MathOp,
        rhs: Box<Expr>,
    },
    Call {
        function: u32,
        args: Vec<Expr>,
    },
}

/// Statement with every name replaced by a slot or function index.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Bare expression; its value is left on the data stack.
    Expr(Expr),
    Assign {
        slot: u32,
        value: Expr,
    },
    Return(Expr),
    /// `else_block` is empty when the source had no else branch.
    IfElse {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Vec<Stmt>,
    },
}

/// A resolved function body. Parameters occupy slots `0..params` in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// Source name, kept for diagnostics and tooling.
    #[allow(dead_code)]
    pub name: String,
    pub params: u32,
    pub body: Vec<Stmt>,
}

/// Output of resolution: the main statement list plus the function table,
/// indexed by the function indices embedded in `Expr::Call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProgram {
    pub main: Vec<Stmt>,
    pub functions: Vec<Function>,
}

// =============================================================================
// Resolver
// =============================================================================

/// Per-function local scope. Slots are unique within one scope and assigned
/// in first-assignment order; each function body starts again at slot 0.
#[derive(Debug, Default)]
struct Scope {
    next_local: u32,
    locals: HashMap<String, u32>,
}

impl Scope {
    fn lookup(&self, name: &str) -> Option<u32> {
        self.locals.get(name).copied()
    }

    /// Returns the existing slot for `name`, or binds a fresh one.
    /// First-assignment-wins: reassignment reuses the slot.
    fn bind(&mut self, name: &str) -> u32 {
        if let Some(slot) = self.lookup(name) {
            return slot;
        }
        let slot = self.next_local;
        self.next_local += 1;
        self.locals.insert(name.to_string(), slot);
        slot
    }
}

/// Two-pass scope resolver.
///
/// Pass 1 hoists every top-level function declaration into the global
/// function table, so calls can appear before the declaration they refer to.
/// Pass 2 walks the statements and rewrites names to indices. Local names
/// never cross a function boundary; only the function table is global.
pub struct Resolver {
    /// Scope stack: one entry per function body being resolved, with the
    /// main scope at the bottom. Lookups consult only the innermost scope.
    scopes: Vec<Scope>,

    /// Global function table: name -> function index. Shared by every scope;
    /// a function name may be declared at most once, at any nesting depth.
    function_indices: HashMap<String, u32>,

    /// Resolved bodies, filled in at each declaration site.
    functions: Vec<Option<Function>>,
}

/// Resolves a parsed program. On error no partial output is produced.
pub fn resolve(program: &Program) -> Result<ResolvedProgram, ResolveError> {
    Resolver::new().resolve_program(program)
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            scopes: vec![Scope::default()],
            function_indices: HashMap::new(),
            functions: Vec::new(),
        }
    }

    fn resolve_program(mut self, program: &Program) -> Result<ResolvedProgram, ResolveError> {
        // Pass 1: hoist top-level function declarations.
        for stmt in &program.statements {
            if let Node::Fn { name, .. } = stmt {
                self.declare_function(name)?;
            }
        }

        // Pass 2: resolve everything.
        let mut main = Vec::new();
        for stmt in &program.statements {
            if let Some(stmt) = self.resolve_stmt(stmt, true)? {
                main.push(stmt);
            }
        }

        let mut functions = Vec::new();
        for (index, function) in self.functions.into_iter().enumerate() {
            functions.push(function.ok_or_else(|| {
                ResolveError::Internal(format!("function index {} has no body", index))
            })?);
        }

        Ok(ResolvedProgram { main, functions })
    }

    fn declare_function(&mut self, name: &str) -> Result<u32, ResolveError> {
        if self.function_indices.contains_key(name) {
            return Err(ResolveError::DuplicateFunction(name.to_string()));
        }
        let index = self.functions.len() as u32;
        self.function_indices.insert(name.to_string(), index);
        self.functions.push(None);
        Ok(index)
    }

    /// Resolves one statement. Function declarations resolve into the
    /// function table and contribute nothing to the statement stream.
    ///
    /// `hoisted` is true for top-level statements, whose function
    /// declarations were already entered into the table by pass 1.
    fn resolve_stmt(&mut self, node: &Node, hoisted: bool) -> Result<Option<Stmt>, ResolveError> {
        match node {
            Node::Fn { name, params, body } => {
                let index = if hoisted {
                    self.function_indices
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| {
                            ResolveError::Internal(format!("function '{}' was not hoisted", name))
                        })?
                } else {
                    // Nested declarations still land in the global table.
                    self.declare_function(name)?
                };

                // Fresh scope for the body; parameters take slots 0..n in
                // declaration order.
                let mut scope = Scope::default();
                for param in params {
                    scope.bind(param);
                }
                self.scopes.push(scope);

                let mut resolved_body = Vec::new();
                for stmt in body {
                    if let Some(stmt) = self.resolve_stmt(stmt, false)? {
                        resolved_body.push(stmt);
                    }
                }
                self.scopes.pop();

                self.functions[index as usize] = Some(Function {
                    name: name.clone(),
                    params: params.len() as u32,
                    body: resolved_body,
                });
                Ok(None)
            }

            Node::Assign { name, value } => {
                // Bind the target before resolving the value, matching
                // declaration-or-update semantics.
                let slot = self.scope_mut().bind(name);
                let value = self.resolve_expr(value)?;
                Ok(Some(Stmt::Assign { slot, value }))
            }

            Node::Return(value) => Ok(Some(Stmt::Return(self.resolve_expr(value)?))),

            Node::IfElse {
                cond,
                then_block,
                else_block,
            } => {
                // Branches share the enclosing scope: a variable assigned
                // inside a branch stays visible after it.
                let cond = self.resolve_expr(cond)?;
                let then_block = self.resolve_block(then_block)?;
                let else_block = match else_block {
                    Some(block) => self.resolve_block(block)?,
                    None => Vec::new(),
                };
                Ok(Some(Stmt::IfElse {
                    cond,
                    then_block,
                    else_block,
                }))
            }

            expr => Ok(Some(Stmt::Expr(self.resolve_expr(expr)?))),
        }
    }

    fn resolve_block(&mut self, block: &[Node]) -> Result<Vec<Stmt>, ResolveError> {
        let mut stmts = Vec::new();
        for stmt in block {
            if let Some(stmt) = self.resolve_stmt(stmt, false)? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    fn resolve_expr(&mut self, node: &Node) -> Result<Expr, ResolveError> {
        match node {
            Node::Num(value) => Ok(Expr::Num(*value)),

            Node::Ident(name) => {
                // Locals are per-function: only the innermost scope counts.
                self.scope()
                    .lookup(name)
                    .map(Expr::Local)
                    .ok_or_else(|| ResolveError::UndefinedVariable(name.clone()))
            }

            Node::BinOp { lhs, op, rhs } => Ok(Expr::BinOp {
                lhs: Box::new(self.resolve_expr(lhs)?),
                op: *op,
                rhs: Box::new(self.resolve_expr(rhs)?),
            }),

            Node::Call { name, args } => {
                let function = self
                    .function_indices
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| ResolveError::UndefinedFunction(name.clone()))?;
                // Arguments are resolved in the caller's scope.
                let args = args
                    .iter()
                    .map(|arg| self.resolve_expr(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Call { function, args })
            }

            Node::Assign { .. } | Node::Return(_) | Node::Fn { .. } | Node::IfElse { .. } => {
                Err(ResolveError::Internal(format!(
                    "statement node in expression position: {:?}",
                    node
                )))
            }
        }
    }

    fn scope(&self) -> &Scope {
        // The stack always holds at least the main scope.
        self.scopes.last().expect("scope stack is never empty")
    }

    fn scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }
}
