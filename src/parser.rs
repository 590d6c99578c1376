use crate::ast::{Node, Program};
use crate::bytecode::MathOp;
use crate::lexer::Spanned;
use crate::parser_error::ParserError;
use crate::token::Token;

/// Binding strength for the precedence-climbing expression loop.
/// Higher binds tighter.
fn precedence(op: MathOp) -> u8 {
    match op {
        MathOp::Or => 1,
        MathOp::And => 2,
        MathOp::Eq | MathOp::Ne => 3,
        MathOp::Lt | MathOp::Gt | MathOp::Le | MathOp::Ge => 4,
        MathOp::Add | MathOp::Sub => 5,
        MathOp::Mul | MathOp::Div => 6,
        MathOp::Exp => 7,
    }
}

/// `^` is the only right-associative operator.
fn is_right_assoc(op: MathOp) -> bool {
    matches!(op, MathOp::Exp)
}

/// Recursive-descent parser for flint.
///
/// Statements are `fn` declarations, `return`, `if`/`else`, assignments and
/// bare expressions; semicolons between statements are optional separators.
/// Expressions use precedence climbing over the 13 binary operators.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    ///
    /// Used to provide stable source locations for errors raised at
    /// end-of-file.
    last_span: Option<crate::lexer::Span>,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_span: None,
        }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let token = self.tokens.get(self.pos);
        if let Some(s) = token {
            self.last_span = Some(s.span.clone());
        }
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    /// Constructs a `ParserError` at the most relevant location: the current
    /// token's span, the last consumed span at EOF, or (1,1) for empty input.
    fn error(&self, message: &str) -> ParserError {
        if let Some(spanned) = self.current() {
            ParserError {
                message: message.to_string(),
                line: spanned.span.line,
                col: spanned.span.col,
            }
        } else if let Some(span) = &self.last_span {
            ParserError {
                message: message.to_string(),
                line: span.line,
                col: span.col,
            }
        } else {
            ParserError {
                message: message.to_string(),
                line: 1,
                col: 1,
            }
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParserError> {
        if self.peek() == Some(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParserError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(&format!("expected {}", what))),
        }
    }

    /// Parses a complete program: statements until `Token::Eof`.
    pub fn parse(&mut self) -> Result<Program, ParserError> {
        let mut statements = Vec::new();

        while let Some(token) = self.peek() {
            if matches!(token, Token::Eof) {
                break;
            }
            statements.push(self.parse_statement()?);
            // statement separators are optional
            while self.peek() == Some(&Token::Semicolon) {
                self.advance();
            }
        }

        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Node, ParserError> {
        match self.peek() {
            Some(Token::Fn) => self.parse_fn(),
            Some(Token::If) => self.parse_if(),
            Some(Token::Return) => {
                self.advance();
                let value = self.parse_expr()?;
                Ok(Node::Return(Box::new(value)))
            }
            Some(Token::Ident(_)) if self.peek_next() == Some(&Token::Assign) => {
                let name = self.expect_ident("a variable name")?;
                self.advance(); // '='
                let value = self.parse_expr()?;
                Ok(Node::Assign {
                    name,
                    value: Box::new(value),
                })
            }
            Some(_) => self.parse_expr(),
            None => Err(self.error("expected a statement")),
        }
    }

    fn parse_fn(&mut self) -> Result<Node, ParserError> {
        self.advance(); // 'fn'
        let name = self.expect_ident("a function name after 'fn'")?;
        self.expect(Token::LParen, "'(' after the function name")?;

        let mut params = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                params.push(self.expect_ident("a parameter name")?);
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')' after the parameter list")?;

        let body = self.parse_block()?;
        Ok(Node::Fn { name, params, body })
    }

    fn parse_if(&mut self) -> Result<Node, ParserError> {
        self.advance(); // 'if'
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;

        let else_block = if self.peek() == Some(&Token::Else) {
            self.advance();
            if self.peek() == Some(&Token::If) {
                // 'else if' chains as a nested IfElse
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Node::IfElse {
            cond: Box::new(cond),
            then_block,
            else_block,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Node>, ParserError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut statements = Vec::new();

        loop {
            while self.peek() == Some(&Token::Semicolon) {
                self.advance();
            }
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(statements);
                }
                Some(Token::Eof) | None => return Err(self.error("expected '}'")),
                Some(_) => statements.push(self.parse_statement()?),
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Node, ParserError> {
        let lhs = self.parse_primary()?;
        self.parse_binop_rhs(lhs, 0)
    }

    /// Precedence climbing over `Token::Op`. `min_prec` is the weakest
    /// binding strength this call is allowed to consume.
    fn parse_binop_rhs(&mut self, mut lhs: Node, min_prec: u8) -> Result<Node, ParserError> {
        while let Some(&Token::Op(op)) = self.peek() {
            let op_prec = precedence(op);
            if op_prec < min_prec {
                break;
            }
            self.advance();
            let mut rhs = self.parse_primary()?;

            while let Some(&Token::Op(next)) = self.peek() {
                let next_prec = precedence(next);
                if next_prec > op_prec || (is_right_assoc(next) && next_prec == op_prec) {
                    rhs = self.parse_binop_rhs(rhs, next_prec)?;
                } else {
                    break;
                }
            }

            lhs = Node::BinOp {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Node, ParserError> {
        match self.peek() {
            Some(Token::Num(value)) => {
                let value = *value;
                self.advance();
                Ok(Node::Num(value))
            }
            Some(Token::Ident(_)) if self.peek_next() == Some(&Token::LParen) => {
                let name = self.expect_ident("a function name")?;
                self.advance(); // '('

                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen, "')' after the argument list")?;
                Ok(Node::Call { name, args })
            }
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Node::Ident(name))
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.error("expected an expression")),
        }
    }
}
