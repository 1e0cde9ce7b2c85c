//! Command language module
//!
//! This module contains the lexer, parser and AST for relshell commands and
//! relational algebra expressions.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Expr, Located, Program, Statement};
pub use parser::{parse_program, parse_statement, Parser};
