//! Relation catalog for relshell
//!
//! The catalog owns every relation, base and temporary, keyed by name in
//! insertion order.

use super::schema::Relation;
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Catalog - the set of named relations
#[derive(Debug, Default)]
pub struct Catalog {
    relations: IndexMap<String, Relation>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a relation by name
    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Get a mutable relation by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.get_mut(name)
    }

    /// Get a relation by name, failing with `RelationNotFound`
    pub fn relation(&self, name: &str) -> Result<&Relation> {
        self.get(name)
            .ok_or_else(|| Error::RelationNotFound(name.to_string()))
    }

    /// Get a mutable relation by name, failing with `RelationNotFound`
    pub fn relation_mut(&mut self, name: &str) -> Result<&mut Relation> {
        self.get_mut(name)
            .ok_or_else(|| Error::RelationNotFound(name.to_string()))
    }

    /// Check if a relation exists
    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Add relations that have already been validated
    pub(crate) fn extend(&mut self, relations: Vec<Relation>) {
        for relation in relations {
            self.relations.insert(relation.name.clone(), relation);
        }
    }

    /// Bind an unnamed algebra result to `name` as a temporary relation.
    ///
    /// An existing temporary relation keeps its identity and position and has
    /// its attributes and tuples replaced. A base relation is never rebound.
    /// Temporary relations carry no key markers and no foreign keys.
    pub fn bind_temporary(&mut self, name: &str, mut result: Relation) -> Result<&Relation> {
        if let Some(existing) = self.relations.get(name) {
            if !existing.temporary {
                return Err(Error::RelationExists(name.to_string()));
            }
        }

        result.name = name.to_string();
        result.schema = result.schema.without_keys();
        result.foreign_keys.clear();
        result.temporary = true;

        let entry = self.relations.entry(name.to_string());
        let bound = match entry {
            indexmap::map::Entry::Occupied(occupied) => {
                let existing = occupied.into_mut();
                existing.schema = result.schema;
                existing.tuples = result.tuples;
                existing
            }
            indexmap::map::Entry::Vacant(vacant) => vacant.insert(result),
        };
        Ok(bound)
    }

    /// All relations in insertion order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    /// Base relations first, then temporary ones, each group in insertion order
    pub fn listing_order(&self) -> Vec<&Relation> {
        let base = self.relations.values().filter(|r| !r.temporary);
        let temporary = self.relations.values().filter(|r| r.temporary);
        base.chain(temporary).collect()
    }

    /// List all relation names
    pub fn names(&self) -> Vec<&str> {
        self.relations.keys().map(|k| k.as_str()).collect()
    }

    /// Number of relations
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if the catalog holds no relations
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Attribute, Schema};
    use crate::storage::TupleSet;
    use crate::tuple;

    fn base(name: &str) -> Relation {
        Relation::new(
            name,
            Schema::from_attributes(vec![Attribute::new("id").primary_key(true)]),
            vec![],
        )
    }

    #[test]
    fn test_lookup() {
        let mut catalog = Catalog::new();
        catalog.extend(vec![base("Dept")]);

        assert!(catalog.contains("Dept"));
        assert_eq!(catalog.relation("Dept").unwrap().name(), "Dept");
        assert!(matches!(
            catalog.relation("Emp"),
            Err(Error::RelationNotFound(name)) if name == "Emp"
        ));
    }

    #[test]
    fn test_bind_temporary_replaces_in_place() {
        let mut catalog = Catalog::new();
        catalog.extend(vec![base("A")]);

        let first = Relation::unnamed(Schema::plain(["x"]), TupleSet::from_iter([tuple![1]]));
        catalog.bind_temporary("T", first).unwrap();
        catalog.extend(vec![base("B")]);

        let second = Relation::unnamed(
            Schema::plain(["y", "z"]),
            TupleSet::from_iter([tuple![2, 3], tuple![4, 5]]),
        );
        let bound = catalog.bind_temporary("T", second).unwrap();
        assert!(bound.temporary);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound.schema().names(), vec!["y", "z"]);

        // Identity and position survive the rebind
        assert_eq!(catalog.names(), vec!["A", "T", "B"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_bind_temporary_rejects_base_name() {
        let mut catalog = Catalog::new();
        catalog.extend(vec![base("Dept")]);

        let result = Relation::unnamed(Schema::plain(["x"]), TupleSet::new());
        assert!(matches!(
            catalog.bind_temporary("Dept", result),
            Err(Error::RelationExists(_))
        ));
        assert!(!catalog.relation("Dept").unwrap().temporary);
    }

    #[test]
    fn test_listing_order() {
        let mut catalog = Catalog::new();
        catalog.extend(vec![base("A")]);
        catalog
            .bind_temporary("T", Relation::unnamed(Schema::plain(["x"]), TupleSet::new()))
            .unwrap();
        catalog.extend(vec![base("B")]);

        let order: Vec<&str> = catalog.listing_order().iter().map(|r| r.name()).collect();
        assert_eq!(order, vec!["A", "B", "T"]);
    }
}
