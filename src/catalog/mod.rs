//! Catalog module
//!
//! This module contains the relation catalog, schema definitions and the
//! constraint checks applied to schema batches and mutations.

pub mod catalog;
pub mod constraints;
pub mod schema;

pub use catalog::Catalog;
pub use schema::{Attribute, ForeignKey, Relation, Schema};
