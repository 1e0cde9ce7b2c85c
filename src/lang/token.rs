//! Token definitions
//!
//! This module defines all tokens that can appear in relshell commands.

use std::fmt;

/// Command language token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // Mutation Keywords
    Insert,
    Delete,
    Force,
    Where,

    // Definition Keywords
    References,

    // Shell Keywords
    Print,
    Exit,

    // Boolean Literals
    True,
    False,

    // ========== Algebra Operators ==========
    /// π
    Project,
    /// σ
    Select,
    /// ⋈
    Join,
    /// ∪ (or U in infix position)
    Union,
    /// ∩
    Intersect,
    /// -
    Minus,
    /// × (or X in infix position)
    Times,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single or double quoted)
    StringLiteral(String),
    /// Identifier (relation name, attribute name)
    Identifier(String),

    // ========== Comparison Operators ==========
    /// =
    Eq,
    /// <> or !=
    Neq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :=
    Assign,
    /// |
    Pipe,
    /// #
    Hash,

    // ========== Special ==========
    /// End of input
    Eof,
}

impl Token {
    /// Try to parse a keyword from a string
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            // Mutation
            "INSERT" => Some(Token::Insert),
            "DELETE" => Some(Token::Delete),
            "FORCE" => Some(Token::Force),
            "WHERE" => Some(Token::Where),

            // Definition
            "REFERENCES" => Some(Token::References),

            // Shell
            "PRINT" => Some(Token::Print),
            "EXIT" => Some(Token::Exit),

            // Boolean Literals
            "TRUE" => Some(Token::True),
            "FALSE" => Some(Token::False),

            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Insert => write!(f, "insert"),
            Token::Delete => write!(f, "delete"),
            Token::Force => write!(f, "force"),
            Token::Where => write!(f, "where"),
            Token::References => write!(f, "references"),
            Token::Print => write!(f, "print"),
            Token::Exit => write!(f, "exit"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Project => write!(f, "π"),
            Token::Select => write!(f, "σ"),
            Token::Join => write!(f, "⋈"),
            Token::Union => write!(f, "∪"),
            Token::Intersect => write!(f, "∩"),
            Token::Minus => write!(f, "-"),
            Token::Times => write!(f, "×"),
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "\"{}\"", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Eq => write!(f, "="),
            Token::Neq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Assign => write!(f, ":="),
            Token::Pipe => write!(f, "|"),
            Token::Hash => write!(f, "#"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A token together with the 1-based line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub line: usize,
}

impl LocatedToken {
    pub fn new(token: Token, line: usize) -> Self {
        Self { token, line }
    }
}
