//! Statement execution module
//!
//! This module contains the relational algebra evaluator and the engine that
//! runs statements against the catalog.

pub mod algebra;
pub mod engine;

pub use algebra::Evaluator;
pub use engine::{ExecutionEngine, QueryResult};
