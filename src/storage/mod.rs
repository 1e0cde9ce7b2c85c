//! In-memory tuple storage
//!
//! Relations keep their rows in memory as sets of [`Tuple`]s of scalar [`Value`]s.

pub mod tuple;

pub use tuple::{Tuple, Value};

/// The tuple set of a relation: no duplicates, insertion order preserved
pub type TupleSet = indexmap::IndexSet<Tuple>;
