use crate::bytecode::MathOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal. The only value type in the language.
    Num(f32),

    /// Variable or function name.
    Ident(String),

    /// One of the 13 binary operators.
    Op(MathOp),

    // Keywords
    Fn,
    Return,
    If,
    Else,

    // Punctuation
    Assign, // =
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    Eof,
}

impl Token {
    /// Keyword lookup for identifier-shaped lexemes.
    pub fn keyword(word: &str) -> Option<Token> {
        match word {
            "fn" => Some(Token::Fn),
            "return" => Some(Token::Return),
            "if" => Some(Token::If),
            "else" => Some(Token::Else),
            _ => None,
        }
    }
}
