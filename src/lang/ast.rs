//! Abstract Syntax Tree (AST)
//!
//! This module defines the AST nodes for relshell commands and algebra
//! expressions.

use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{Attribute, ForeignKey, Relation, Schema};
use crate::storage::Value;

/// A command statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A batch of relation definitions
    DefineRelations(Vec<RelationDef>),
    /// insert / force insert
    Insert(InsertStatement),
    /// delete / force delete
    Delete(DeleteStatement),
    /// `name := expr`
    Assign(AssignStatement),
    /// A bare expression, evaluated and printed
    Evaluate(Expr),
    /// print R
    PrintRelation(String),
    /// .model / .raw_model
    PrintModel(ModelStyle),
    /// exit
    Exit,
}

impl Statement {
    /// Short name of the statement kind, for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::DefineRelations(_) => "define",
            Statement::Insert(_) => "insert",
            Statement::Delete(_) => "delete",
            Statement::Assign(_) => "assign",
            Statement::Evaluate(_) => "evaluate",
            Statement::PrintRelation(_) => "print",
            Statement::PrintModel(_) => "model",
            Statement::Exit => "exit",
        }
    }
}

/// A node tagged with the 1-based line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    pub node: T,
    pub line: usize,
}

impl<T> Located<T> {
    pub fn new(node: T, line: usize) -> Self {
        Self { node, line }
    }
}

/// A parsed program file: one schema batch, then inserts and assignments
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub schema: Located<Vec<RelationDef>>,
    pub commands: Vec<Located<Statement>>,
}

/// Relation definition as written, not yet validated
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDef {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl RelationDef {
    /// Build the empty base relation this definition declares
    pub fn into_relation(self) -> Relation {
        Relation::new(
            self.name,
            Schema::from_attributes(self.attributes),
            self.foreign_keys,
        )
    }
}

/// Whether a mutation runs the referential checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Foreign keys are enforced
    Checked,
    /// Foreign keys are skipped (seeding)
    Force,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub relation: String,
    pub values: Vec<Literal>,
    pub mode: CheckMode,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub relation: String,
    pub condition: Condition,
    pub mode: CheckMode,
}

/// Assignment of an expression result to a temporary relation
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStatement {
    pub name: String,
    pub expr: Expr,
}

/// Model listing style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStyle {
    /// Plain text
    Raw,
    /// ANSI decorated
    Decorated,
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

impl Literal {
    /// Convert to a runtime value
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(n) => write!(f, "{:?}", n),
            Literal::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Evaluate `left op right`.
    ///
    /// Values of incomparable kinds are never ordered and never equal.
    pub fn holds(&self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Neq => left != right,
            CompareOp::Lt => left.compare(right) == Some(Ordering::Less),
            CompareOp::Lte => matches!(
                left.compare(right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => left.compare(right) == Some(Ordering::Greater),
            CompareOp::Gte => matches!(
                left.compare(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// `attribute op literal`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub op: CompareOp,
    pub value: Literal,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.op, self.value)
    }
}

/// `left_attribute = right_attribute`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub left: String,
    pub right: String,
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// Relational algebra expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A named relation
    Relation(String),
    /// π columns (input)
    Project {
        columns: Vec<String>,
        input: Box<Expr>,
    },
    /// σ condition (input)
    Select {
        condition: Condition,
        input: Box<Expr>,
    },
    /// left ⋈ right | condition
    Join {
        left: Box<Expr>,
        right: Box<Expr>,
        condition: JoinCondition,
    },
    /// left ∪ right
    Union { left: Box<Expr>, right: Box<Expr> },
    /// left ∩ right
    Intersect { left: Box<Expr>, right: Box<Expr> },
    /// left - right
    Difference { left: Box<Expr>, right: Box<Expr> },
    /// left × right
    Product { left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    /// Shorthand for a relation reference
    pub fn relation(name: impl Into<String>) -> Self {
        Expr::Relation(name.into())
    }

    fn is_infix(&self) -> bool {
        !matches!(
            self,
            Expr::Relation(_) | Expr::Project { .. } | Expr::Select { .. }
        )
    }

    // Binary operators are left-associative, so only a right operand needs parentheses
    fn fmt_infix(
        f: &mut fmt::Formatter<'_>,
        left: &Expr,
        symbol: &str,
        right: &Expr,
    ) -> fmt::Result {
        write!(f, "{} {} ", left, symbol)?;
        if right.is_infix() {
            write!(f, "({})", right)
        } else {
            write!(f, "{}", right)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Relation(name) => write!(f, "{}", name),
            Expr::Project { columns, input } => {
                write!(f, "π {} ({})", columns.join(", "), input)
            }
            Expr::Select { condition, input } => write!(f, "σ {} ({})", condition, input),
            Expr::Join {
                left,
                right,
                condition,
            } => {
                Expr::fmt_infix(f, left, "⋈", right)?;
                write!(f, " | {}", condition)
            }
            Expr::Union { left, right } => Expr::fmt_infix(f, left, "∪", right),
            Expr::Intersect { left, right } => Expr::fmt_infix(f, left, "∩", right),
            Expr::Difference { left, right } => Expr::fmt_infix(f, left, "-", right),
            Expr::Product { left, right } => Expr::fmt_infix(f, left, "×", right),
        }
    }
}
