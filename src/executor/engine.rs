//! Execution engine for relshell
//!
//! This module dispatches parsed statements to the constraint checks and the
//! algebra evaluator, and owns the catalog they operate on.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use super::algebra::Evaluator;
use crate::catalog::{constraints, Catalog, Relation};
use crate::error::{Error, Result};
use crate::format;
use crate::lang::ast::*;
use crate::lang::{parse_program, parse_statement};
use crate::storage::Tuple;

/// Statement result
#[derive(Debug, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result tuples
    pub rows: Vec<Tuple>,
    /// Number of affected tuples (for insert/delete)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
    /// The statement asked to leave the shell
    #[serde(skip)]
    pub exit: bool,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
            exit: false,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected tuples count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result holding every tuple of a relation
    pub fn from_relation(relation: &Relation) -> Self {
        Self {
            columns: relation
                .schema()
                .names()
                .into_iter()
                .map(String::from)
                .collect(),
            rows: relation.tuples().cloned().collect(),
            ..Self::empty()
        }
    }

    /// Create the result of an exit statement
    pub fn exit() -> Self {
        Self {
            exit: true,
            ..Self::empty()
        }
    }
}

/// Execution Engine
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    /// Every relation, base and temporary
    catalog: Catalog,
}

impl ExecutionEngine {
    /// Create a new engine with an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute a statement
    pub fn execute(&mut self, stmt: Statement) -> Result<QueryResult> {
        debug!(kind = stmt.kind(), "executing statement");

        match stmt {
            Statement::DefineRelations(defs) => self.execute_define(defs),
            Statement::Insert(insert) => self.execute_insert(insert),
            Statement::Delete(delete) => self.execute_delete(delete),
            Statement::Assign(assign) => self.execute_assign(assign),
            other => self.query(&other),
        }
    }

    /// Execute a statement that only reads the catalog
    pub fn query(&self, stmt: &Statement) -> Result<QueryResult> {
        match stmt {
            Statement::Evaluate(expr) => {
                let relation = Evaluator::new(&self.catalog).evaluate(expr)?;
                Ok(QueryResult::from_relation(&relation))
            }
            Statement::PrintRelation(name) => {
                Ok(QueryResult::from_relation(self.catalog.relation(name)?))
            }
            Statement::PrintModel(style) => Ok(QueryResult::with_message(format::format_model(
                &self.catalog,
                *style,
            ))),
            Statement::Exit => Ok(QueryResult::exit()),
            other => Err(Error::WriteRequired(other.kind().to_string())),
        }
    }

    /// Parse one statement from text and execute it; errors carry its line
    pub fn execute_source(&mut self, source: &str) -> Result<QueryResult> {
        let Located { node, line } = parse_statement(source)?;
        self.execute(node).map_err(|e| e.at_line(line))
    }

    /// Load a program: its schema batch, then every command in order.
    ///
    /// Stops at the first error, which carries the failing line. Commands
    /// applied before the failure stay applied.
    pub fn load_program(&mut self, source: &str) -> Result<()> {
        let program = parse_program(source)?;

        let Located { node: defs, line } = program.schema;
        if !defs.is_empty() {
            self.execute_define(defs).map_err(|e| e.at_line(line))?;
        }

        let count = program.commands.len();
        for Located { node, line } in program.commands {
            self.execute(node).map_err(|e| e.at_line(line))?;
        }

        info!(
            relations = self.catalog.len(),
            commands = count,
            "program loaded"
        );
        Ok(())
    }

    /// Load a program file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        info!(path = %path.display(), "loading program file");
        self.load_program(&source)
    }

    fn execute_define(&mut self, defs: Vec<RelationDef>) -> Result<QueryResult> {
        let names: Vec<String> = defs.iter().map(|d| d.name.clone()).collect();
        let relations = defs.into_iter().map(RelationDef::into_relation).collect();

        constraints::define_relations(&mut self.catalog, relations)?;

        Ok(QueryResult::with_message(format!(
            "Relations defined: {}",
            names.join(", ")
        )))
    }

    fn execute_insert(&mut self, insert: InsertStatement) -> Result<QueryResult> {
        let values = insert.values.iter().map(Literal::to_value).collect();
        let added = constraints::insert(&mut self.catalog, &insert.relation, values, insert.mode)?;

        let count = usize::from(added);
        Ok(QueryResult::with_affected_rows(
            count,
            format!("{} tuple(s) inserted into {}", count, insert.relation),
        ))
    }

    fn execute_delete(&mut self, delete: DeleteStatement) -> Result<QueryResult> {
        let count = constraints::delete(
            &mut self.catalog,
            &delete.relation,
            &delete.condition,
            delete.mode,
        )?;

        Ok(QueryResult::with_affected_rows(
            count,
            format!("{} tuple(s) deleted from {}", count, delete.relation),
        ))
    }

    fn execute_assign(&mut self, assign: AssignStatement) -> Result<QueryResult> {
        // A base relation is never rebound, so fail before evaluating
        let rebinding = match self.catalog.get(&assign.name) {
            Some(existing) if !existing.temporary => {
                return Err(Error::RelationExists(assign.name));
            }
            Some(_) => true,
            None => false,
        };

        let result = Evaluator::new(&self.catalog)
            .evaluate(&assign.expr)?
            .into_owned();
        let bound = self.catalog.bind_temporary(&assign.name, result)?;

        info!(
            relation = %assign.name,
            tuples = bound.len(),
            rebound = rebinding,
            "temporary relation bound"
        );
        Ok(QueryResult::with_message(format!(
            "{} := {} ({} tuple(s))",
            assign.name,
            assign.expr,
            bound.len()
        )))
    }
}
