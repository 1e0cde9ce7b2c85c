//! Constraint validation for relshell
//!
//! Schema batches are validated in full before anything is committed.
//! Inserts and deletes check primary and foreign keys before touching the
//! tuple set, so a rejected mutation leaves the relation exactly as it was.

use std::collections::HashSet;

use indexmap::IndexSet;
use tracing::{debug, info};

use super::catalog::Catalog;
use super::schema::{ForeignKey, Relation};
use crate::error::{Error, Result};
use crate::lang::ast::{CheckMode, Condition};
use crate::storage::{Tuple, Value};

/// Names that occur more than once, in first-repeat order
fn duplicates<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut repeated: IndexSet<&str> = IndexSet::new();
    for name in names {
        if !seen.insert(name) {
            repeated.insert(name);
        }
    }
    repeated.into_iter().map(str::to_string).collect()
}

fn constraint_label(relation: &str, fk: &ForeignKey) -> String {
    format!("{}.{}", relation, fk)
}

/// Validate a batch of newly declared relations and add them to the catalog.
///
/// Checks run in this order, each with its own error:
/// duplicate names inside the batch, collision with the catalog, then per
/// relation duplicate attributes, foreign key markers against foreign key
/// entries, referenced relation and referenced attribute.
pub fn define_relations(catalog: &mut Catalog, relations: Vec<Relation>) -> Result<()> {
    let repeated = duplicates(relations.iter().map(|r| r.name()));
    if !repeated.is_empty() {
        return Err(Error::DuplicateRelation(repeated));
    }

    if let Some(existing) = relations.iter().find(|r| catalog.contains(r.name())) {
        return Err(Error::RelationExists(existing.name.clone()));
    }

    for relation in &relations {
        validate_relation(catalog, &relations, relation)?;
    }

    info!(
        relations = ?relations.iter().map(|r| r.name()).collect::<Vec<_>>(),
        "schema batch committed"
    );
    catalog.extend(relations);
    Ok(())
}

fn validate_relation(catalog: &Catalog, batch: &[Relation], relation: &Relation) -> Result<()> {
    let attributes = relation.schema.attributes();

    let repeated = duplicates(attributes.iter().map(|a| a.name.as_str()));
    if !repeated.is_empty() {
        return Err(Error::DuplicateAttribute {
            relation: relation.name.clone(),
            attributes: repeated,
        });
    }

    let marked: IndexSet<&str> = attributes
        .iter()
        .filter(|a| a.foreign_key)
        .map(|a| a.name.as_str())
        .collect();
    let explained: IndexSet<&str> = relation
        .foreign_keys
        .iter()
        .map(|fk| fk.referencer.as_str())
        .collect();

    let not_explained: Vec<String> = marked
        .difference(&explained)
        .map(|s| s.to_string())
        .collect();
    if !not_explained.is_empty() {
        return Err(Error::ForeignKeyNotExplained {
            relation: relation.name.clone(),
            attributes: not_explained,
        });
    }

    let not_declared: Vec<String> = explained
        .difference(&marked)
        .map(|s| s.to_string())
        .collect();
    if !not_declared.is_empty() {
        return Err(Error::ForeignKeyNotDeclared {
            relation: relation.name.clone(),
            attributes: not_declared,
        });
    }

    for fk in &relation.foreign_keys {
        let referenced = batch
            .iter()
            .find(|r| r.name == fk.referenced_relation)
            .or_else(|| catalog.get(&fk.referenced_relation))
            .ok_or_else(|| Error::ReferencedRelationNotFound(fk.referenced_relation.clone()))?;

        if !referenced.schema.has_attribute(&fk.referenced_attribute) {
            return Err(Error::ReferencedAttributeNotFound {
                relation: referenced.name.clone(),
                attribute: fk.referenced_attribute.clone(),
            });
        }
    }

    Ok(())
}

/// Resolve `fk` to (referencer position, referenced relation, referenced position)
fn resolve_foreign_key<'a>(
    catalog: &'a Catalog,
    relation: &Relation,
    fk: &ForeignKey,
) -> Result<(usize, &'a Relation, usize)> {
    let referencer_index =
        relation
            .schema
            .index_of(&fk.referencer)
            .ok_or_else(|| Error::ColumnNotFound {
                relation: relation.name.clone(),
                columns: vec![fk.referencer.clone()],
            })?;
    let referenced = catalog
        .get(&fk.referenced_relation)
        .ok_or_else(|| Error::ReferencedRelationNotFound(fk.referenced_relation.clone()))?;
    let referenced_index = referenced
        .schema
        .index_of(&fk.referenced_attribute)
        .ok_or_else(|| Error::ReferencedAttributeNotFound {
            relation: referenced.name.clone(),
            attribute: fk.referenced_attribute.clone(),
        })?;
    Ok((referencer_index, referenced, referenced_index))
}

/// Validate a tuple for `relation_name` and add it to the tuple set.
///
/// Adding a tuple that is already present changes nothing. Returns whether
/// the tuple set grew.
pub fn insert(
    catalog: &mut Catalog,
    relation_name: &str,
    values: Vec<Value>,
    mode: CheckMode,
) -> Result<bool> {
    let relation = catalog.relation(relation_name)?;

    if values.len() != relation.arity() {
        return Err(Error::ArityMismatch {
            expected: relation.arity(),
            found: values.len(),
        });
    }

    let tuple = Tuple::new(values);

    let pk_indices = relation.schema.primary_key_indices();
    if !pk_indices.is_empty() {
        let key = tuple.project(&pk_indices);
        if relation.tuples().any(|t| t.project(&pk_indices) == key) {
            debug!(relation = relation_name, %key, "primary key violation");
            return Err(Error::PrimaryKeyViolation {
                relation: relation_name.to_string(),
                key: key.into_values(),
            });
        }
    }

    if mode == CheckMode::Checked {
        for fk in &relation.foreign_keys {
            let (referencer_index, referenced, referenced_index) =
                resolve_foreign_key(catalog, relation, fk)?;
            let value = &tuple.values()[referencer_index];
            let present = referenced
                .tuples()
                .any(|t| t.get(referenced_index) == Some(value));
            if !present {
                debug!(relation = relation_name, %value, "foreign key violation");
                return Err(Error::ForeignKeyViolation {
                    constraint: constraint_label(relation_name, fk),
                    values: vec![value.clone()],
                });
            }
        }
    }

    let relation = catalog.relation_mut(relation_name)?;
    let added = relation.tuples.insert(tuple);
    debug!(relation = relation_name, added, "insert applied");
    Ok(added)
}

/// Remove every tuple of `relation_name` satisfying `condition`.
///
/// In checked mode the delete is rejected as a whole when any relation
/// referencing this one still uses a value that would disappear from the
/// referenced attribute. Returns the number of removed tuples.
pub fn delete(
    catalog: &mut Catalog,
    relation_name: &str,
    condition: &Condition,
    mode: CheckMode,
) -> Result<usize> {
    let relation = catalog.relation(relation_name)?;

    let index = relation
        .schema
        .index_of(&condition.attribute)
        .ok_or_else(|| Error::ColumnNotFound {
            relation: relation_name.to_string(),
            columns: vec![condition.attribute.clone()],
        })?;

    let value = condition.value.to_value();
    let (doomed, surviving): (Vec<&Tuple>, Vec<&Tuple>) = relation
        .tuples()
        .partition(|t| t.get(index).is_some_and(|v| condition.op.holds(v, &value)));
    debug!(
        relation = relation_name,
        candidates = doomed.len(),
        "delete candidates computed"
    );

    if mode == CheckMode::Checked && !doomed.is_empty() {
        for referencer in catalog.relations() {
            for fk in referencer
                .foreign_keys
                .iter()
                .filter(|fk| fk.referenced_relation == relation_name)
            {
                check_still_referenced(relation, referencer, fk, &doomed, &surviving)?;
            }
        }
    }

    let doomed: HashSet<Tuple> = doomed.into_iter().cloned().collect();
    let relation = catalog.relation_mut(relation_name)?;
    relation.tuples.retain(|t| !doomed.contains(t));
    debug!(relation = relation_name, removed = doomed.len(), "delete applied");
    Ok(doomed.len())
}

fn check_still_referenced(
    relation: &Relation,
    referencer: &Relation,
    fk: &ForeignKey,
    doomed: &[&Tuple],
    surviving: &[&Tuple],
) -> Result<()> {
    let referenced_index = relation
        .schema
        .index_of(&fk.referenced_attribute)
        .ok_or_else(|| Error::ReferencedAttributeNotFound {
            relation: relation.name.clone(),
            attribute: fk.referenced_attribute.clone(),
        })?;
    let referencer_index =
        referencer
            .schema
            .index_of(&fk.referencer)
            .ok_or_else(|| Error::ColumnNotFound {
                relation: referencer.name.clone(),
                columns: vec![fk.referencer.clone()],
            })?;

    // A value only disappears if no surviving tuple still carries it
    let kept: HashSet<&Value> = surviving
        .iter()
        .filter_map(|t| t.get(referenced_index))
        .collect();
    let removed: IndexSet<&Value> = doomed
        .iter()
        .filter_map(|t| t.get(referenced_index))
        .filter(|v| !kept.contains(v))
        .collect();

    // A self-referencing relation only counts the rows that stay
    let self_reference = referencer.name == relation.name;
    let used: HashSet<&Value> = if self_reference {
        surviving
            .iter()
            .filter_map(|t| t.get(referencer_index))
            .collect()
    } else {
        referencer
            .tuples()
            .filter_map(|t| t.get(referencer_index))
            .collect()
    };

    let still_used: Vec<Value> = removed
        .into_iter()
        .filter(|v| used.contains(v))
        .cloned()
        .collect();
    if !still_used.is_empty() {
        return Err(Error::ForeignKeyViolation {
            constraint: constraint_label(&referencer.name, fk),
            values: still_used,
        });
    }
    Ok(())
}
