//! relshell - an interactive relational algebra shell written in Rust
//!
//! This library provides the components behind the shell:
//! - Command language (lexer, parser, AST)
//! - Catalog of relations with key and foreign key checks
//! - Relational algebra evaluation
//! - Result and model rendering

pub mod catalog;
pub mod error;
pub mod executor;
pub mod format;
pub mod lang;
pub mod storage;

pub use error::{Error, Result};
