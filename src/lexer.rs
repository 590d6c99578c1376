use crate::bytecode::MathOp;
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexerError {}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>) -> LexerError {
        LexerError {
            message: message.into(),
            line: self.line,
            col: self.col,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                // comment runs to end of line
                while let Some(ch) = self.current() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Matches `[0-9]+\.?[0-9]*`. There is no unary minus; negative values
    /// are written as `0 - x`.
    fn read_number(&mut self) -> Result<Token, LexerError> {
        let mut digits = String::new();

        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.current() == Some('.') {
            digits.push('.');
            self.advance();
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        digits
            .parse::<f32>()
            .map(Token::Num)
            .map_err(|_| self.error(format!("invalid number literal '{}'", digits)))
    }

    fn read_ident(&mut self) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Token::keyword(&word).unwrap_or(Token::Ident(word))
    }

    /// Operators and punctuation. Two-character operators (`<=`, `==`, `&&`,
    /// ...) are matched before their one-character prefixes.
    fn read_symbol(&mut self) -> Result<Token, LexerError> {
        let ch = self.current().unwrap_or_default();
        let next = self.peek();

        let token = match (ch, next) {
            ('<', Some('=')) => {
                self.advance();
                Token::Op(MathOp::Le)
            }
            ('>', Some('=')) => {
                self.advance();
                Token::Op(MathOp::Ge)
            }
            ('=', Some('=')) => {
                self.advance();
                Token::Op(MathOp::Eq)
            }
            ('!', Some('=')) => {
                self.advance();
                Token::Op(MathOp::Ne)
            }
            ('&', Some('&')) => {
                self.advance();
                Token::Op(MathOp::And)
            }
            ('|', Some('|')) => {
                self.advance();
                Token::Op(MathOp::Or)
            }
            ('&', _) => return Err(self.error("unexpected '&' (did you mean '&&'?)")),
            ('|', _) => return Err(self.error("unexpected '|' (did you mean '||'?)")),
            ('!', _) => return Err(self.error("unexpected '!' (did you mean '!='?)")),
            ('+', _) => Token::Op(MathOp::Add),
            ('-', _) => Token::Op(MathOp::Sub),
            ('*', _) => Token::Op(MathOp::Mul),
            ('/', _) => Token::Op(MathOp::Div),
            ('^', _) => Token::Op(MathOp::Exp),
            ('<', _) => Token::Op(MathOp::Lt),
            ('>', _) => Token::Op(MathOp::Gt),
            ('=', _) => Token::Assign,
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            ('{', _) => Token::LBrace,
            ('}', _) => Token::RBrace,
            (',', _) => Token::Comma,
            (';', _) => Token::Semicolon,
            _ => return Err(self.error(format!("unexpected character '{}'", ch))),
        };

        self.advance();
        Ok(token)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let span = self.span();

            let token = match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span,
                    });
                    return Ok(tokens);
                }
                Some(ch) if ch.is_ascii_digit() => self.read_number()?,
                Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => self.read_ident(),
                Some(_) => self.read_symbol()?,
            };

            tokens.push(Spanned { token, span });
        }
    }
}
