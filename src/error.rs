//! Error types for relshell
//!
//! This module defines all error types used throughout the relational engine.

use crate::storage::Value;
use thiserror::Error;

fn joined<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a list of identifiers as `{a, b}`
fn braced<T: std::fmt::Display>(items: &[T]) -> String {
    format!("{{{}}}", joined(items))
}

/// The main error type for relshell
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' on line {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting on line {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format on line {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    // ========== Definition Errors ==========
    #[error("Duplicate definitions of the same relations {}", braced(.0))]
    DuplicateRelation(Vec<String>),

    #[error("Relation {0} already exists")]
    RelationExists(String),

    #[error("Duplicate attributes {} in relation {relation}", braced(.attributes))]
    DuplicateAttribute {
        relation: String,
        attributes: Vec<String>,
    },

    #[error("Foreign key attributes {} of relation {relation} not explained", braced(.attributes))]
    ForeignKeyNotExplained {
        relation: String,
        attributes: Vec<String>,
    },

    #[error("Foreign key attributes {} of relation {relation} explained but not declared", braced(.attributes))]
    ForeignKeyNotDeclared {
        relation: String,
        attributes: Vec<String>,
    },

    #[error("Referenced relation {0} not defined")]
    ReferencedRelationNotFound(String),

    #[error("Referenced attribute {relation}.{attribute} not defined")]
    ReferencedAttributeNotFound { relation: String, attribute: String },

    // ========== Lookup Errors ==========
    #[error("Relation {0} not found")]
    RelationNotFound(String),

    #[error("Columns {} not defined in relation {relation}", braced(.columns))]
    ColumnNotFound {
        relation: String,
        columns: Vec<String>,
    },

    // ========== Mutation Errors ==========
    #[error("Arity of tuple is {found}. Expected {expected}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Primary key constraint failed on relation {relation}: ({})", joined(.key))]
    PrimaryKeyViolation { relation: String, key: Vec<Value> },

    #[error("Foreign key constraint failed ({constraint}): {}", braced(.values))]
    ForeignKeyViolation {
        constraint: String,
        values: Vec<Value>,
    },

    // ========== Algebra Errors ==========
    #[error("Union relations {left}, {right} have different number of attributes")]
    UnionArityMismatch { left: String, right: String },

    #[error("Intersection relations {left}, {right} have different number of attributes")]
    IntersectionArityMismatch { left: String, right: String },

    #[error("Difference relations {left}, {right} have different number of attributes")]
    DifferenceArityMismatch { left: String, right: String },

    // ========== Access Errors ==========
    #[error("Statement '{0}' modifies the catalog and cannot run as a query")]
    WriteRequired(String),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ========== Location ==========
    #[error("Line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the source line of the command that failed.
    ///
    /// An error that already carries a line keeps it.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            located @ Error::AtLine { .. } => located,
            other => Error::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }

    /// Strip any location wrapper
    pub fn inner(&self) -> &Error {
        match self {
            Error::AtLine { source, .. } => source.inner(),
            other => other,
        }
    }
}

/// Result type alias for relshell operations
pub type Result<T> = std::result::Result<T, Error>;
