//! Schema definitions for relshell
//!
//! This module defines relations, their attributes and their foreign keys.
//! Nothing here validates anything: a [`Relation`] can exist in a just-parsed
//! state, and the constraint checks live in [`super::constraints`].

use crate::storage::{Tuple, TupleSet};
use std::collections::HashMap;
use std::fmt;

/// Attribute (column) of a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Is this part of the primary key?
    pub primary_key: bool,
    /// Is this a foreign key?
    pub foreign_key: bool,
}

impl Attribute {
    /// Create a plain attribute
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            foreign_key: false,
        }
    }

    /// Set primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        self
    }

    /// Set foreign key flag
    pub fn foreign_key(mut self, fk: bool) -> Self {
        self.foreign_key = fk;
        self
    }
}

/// `referencer references Relation.attribute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Attribute of the owning relation
    pub referencer: String,
    /// Relation being referenced
    pub referenced_relation: String,
    /// Attribute of the referenced relation
    pub referenced_attribute: String,
}

impl ForeignKey {
    pub fn new(
        referencer: impl Into<String>,
        referenced_relation: impl Into<String>,
        referenced_attribute: impl Into<String>,
    ) -> Self {
        Self {
            referencer: referencer.into(),
            referenced_relation: referenced_relation.into(),
            referenced_attribute: referenced_attribute.into(),
        }
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} references {}.{}",
            self.referencer, self.referenced_relation, self.referenced_attribute
        )
    }
}

/// Ordered attribute list with a name index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of attributes
    attributes: Vec<Attribute>,
    /// Attribute name to position mapping
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema from a list of attributes
    pub fn from_attributes(attributes: Vec<Attribute>) -> Self {
        let mut schema = Self::new();
        for attribute in attributes {
            schema.add_attribute(attribute);
        }
        schema
    }

    /// Create a schema of plain attributes (no key markers)
    pub fn plain<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_attributes(names.into_iter().map(Attribute::new).collect())
    }

    /// Add an attribute to the schema.
    ///
    /// A repeated name keeps the index of its first occurrence.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.name_to_index
            .entry(attribute.name.clone())
            .or_insert(self.attributes.len());
        self.attributes.push(attribute);
    }

    /// Get attribute position by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Check if attribute exists
    pub fn has_attribute(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get all attributes
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Number of attributes
    pub fn arity(&self) -> usize {
        self.attributes.len()
    }

    /// Positions of the primary key attributes
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| a.primary_key)
            .map(|(i, _)| i)
            .collect()
    }

    /// Attribute names in order
    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// The same attribute names with every key marker cleared
    pub fn without_keys(&self) -> Self {
        Self::plain(self.attributes.iter().map(|a| a.name.clone()))
    }
}

/// A relation: schema, foreign keys and tuple set
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Relation name (empty for unnamed algebra results)
    pub name: String,
    /// Attribute layout of every tuple
    pub schema: Schema,
    /// Declared foreign keys
    pub foreign_keys: Vec<ForeignKey>,
    /// Tuples held by the relation
    pub tuples: TupleSet,
    /// Bound result of an algebra expression rather than a declared relation
    pub temporary: bool,
}

impl Relation {
    /// Create a base relation with no tuples
    pub fn new(name: impl Into<String>, schema: Schema, foreign_keys: Vec<ForeignKey>) -> Self {
        Self {
            name: name.into(),
            schema,
            foreign_keys,
            tuples: TupleSet::new(),
            temporary: false,
        }
    }

    /// Create an unnamed relation, as produced by the algebra evaluator
    pub fn unnamed(schema: Schema, tuples: TupleSet) -> Self {
        Self {
            name: String::new(),
            schema,
            foreign_keys: Vec::new(),
            tuples,
            temporary: false,
        }
    }

    /// Get the relation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the relation schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of attributes
    pub fn arity(&self) -> usize {
        self.schema.arity()
    }

    /// Iterate tuples in insertion order
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// Number of tuples
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Check if the relation holds no tuples
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple;

    #[test]
    fn test_schema_creation() {
        let schema = Schema::from_attributes(vec![
            Attribute::new("id").primary_key(true),
            Attribute::new("name"),
            Attribute::new("dept").foreign_key(true),
        ]);

        assert_eq!(schema.arity(), 3);
        assert!(schema.has_attribute("id"));
        assert!(!schema.has_attribute("unknown"));
        assert_eq!(schema.index_of("dept"), Some(2));
        assert_eq!(schema.primary_key_indices(), vec![0]);
        assert!(schema.attributes()[2].foreign_key);
    }

    #[test]
    fn test_duplicate_attribute_keeps_first_index() {
        let schema = Schema::plain(["a", "b", "a"]);
        assert_eq!(schema.arity(), 3);
        assert_eq!(schema.index_of("a"), Some(0));
    }

    #[test]
    fn test_without_keys() {
        let schema = Schema::from_attributes(vec![Attribute::new("id").primary_key(true)]);
        let plain = schema.without_keys();
        assert_eq!(plain.names(), vec!["id"]);
        assert!(plain.primary_key_indices().is_empty());
    }

    #[test]
    fn test_relation_tuple_set() {
        let mut relation = Relation::new("Dept", Schema::plain(["id", "name"]), vec![]);
        relation.tuples.insert(tuple![1, "Eng"]);
        relation.tuples.insert(tuple![2, "Ops"]);
        relation.tuples.insert(tuple![1, "Eng"]);

        assert_eq!(relation.len(), 2);
        assert_eq!(relation.arity(), 2);
    }

    #[test]
    fn test_foreign_key_display() {
        let fk = ForeignKey::new("dept", "Dept", "id");
        assert_eq!(fk.to_string(), "dept references Dept.id");
    }
}
