//! Relational algebra evaluator
//!
//! Every operator reads its operands from the catalog and builds a fresh,
//! unnamed relation. Operands are never mutated, and a bare relation
//! reference is borrowed rather than copied.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::catalog::{Catalog, Relation, Schema};
use crate::error::{Error, Result};
use crate::lang::ast::{Condition, Expr, JoinCondition};
use crate::storage::{Tuple, TupleSet, Value};

/// Suffix appended to a right-hand attribute whose name is already used on the left
pub const COLLISION_SUFFIX: &str = "_";

/// Evaluates algebra expressions against a catalog snapshot
pub struct Evaluator<'a> {
    catalog: &'a Catalog,
}

impl<'a> Evaluator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Evaluate an expression into a relation
    pub fn evaluate(&self, expr: &Expr) -> Result<Cow<'a, Relation>> {
        let result = match expr {
            Expr::Relation(name) => return Ok(Cow::Borrowed(self.catalog.relation(name)?)),
            Expr::Project { columns, input } => self.project(input, columns)?,
            Expr::Select { condition, input } => self.select(input, condition)?,
            Expr::Join {
                left,
                right,
                condition,
            } => self.join(left, right, condition)?,
            Expr::Union { left, right } => self.union(left, right)?,
            Expr::Intersect { left, right } => self.intersect(left, right)?,
            Expr::Difference { left, right } => self.difference(left, right)?,
            Expr::Product { left, right } => self.product(left, right)?,
        };

        debug!(expr = %expr, tuples = result.len(), "expression evaluated");
        Ok(Cow::Owned(result))
    }

    fn project(&self, input: &Expr, columns: &[String]) -> Result<Relation> {
        let source = self.evaluate(input)?;
        let schema = source.schema();

        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !schema.has_attribute(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::ColumnNotFound {
                relation: input.to_string(),
                columns: missing,
            });
        }

        let mut seen = HashSet::new();
        let repeated: Vec<String> = columns
            .iter()
            .filter(|c| !seen.insert(c.as_str()))
            .cloned()
            .collect();
        if !repeated.is_empty() {
            return Err(Error::DuplicateAttribute {
                relation: input.to_string(),
                attributes: repeated,
            });
        }

        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|c| schema.index_of(c))
            .collect();
        let tuples: TupleSet = source.tuples().map(|t| t.project(&indices)).collect();

        Ok(Relation::unnamed(Schema::plain(columns.iter().cloned()), tuples))
    }

    fn select(&self, input: &Expr, condition: &Condition) -> Result<Relation> {
        let source = self.evaluate(input)?;

        let index = source
            .schema()
            .index_of(&condition.attribute)
            .ok_or_else(|| Error::ColumnNotFound {
                relation: input.to_string(),
                columns: vec![condition.attribute.clone()],
            })?;

        let value = condition.value.to_value();
        let tuples: TupleSet = source
            .tuples()
            .filter(|t| t.get(index).is_some_and(|v| condition.op.holds(v, &value)))
            .cloned()
            .collect();

        Ok(Relation::unnamed(source.schema().without_keys(), tuples))
    }

    fn join(&self, left: &Expr, right: &Expr, condition: &JoinCondition) -> Result<Relation> {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;

        let left_index = lhs
            .schema()
            .index_of(&condition.left)
            .ok_or_else(|| Error::ColumnNotFound {
                relation: left.to_string(),
                columns: vec![condition.left.clone()],
            })?;
        let right_index = rhs
            .schema()
            .index_of(&condition.right)
            .ok_or_else(|| Error::ColumnNotFound {
                relation: right.to_string(),
                columns: vec![condition.right.clone()],
            })?;

        // Hash the right side, probe with the left so output stays left-major
        let mut buckets: HashMap<&Value, Vec<&Tuple>> = HashMap::new();
        for tuple in rhs.tuples() {
            if let Some(key) = tuple.get(right_index) {
                buckets.entry(key).or_default().push(tuple);
            }
        }

        let mut tuples = TupleSet::new();
        for l_tuple in lhs.tuples() {
            let matches = l_tuple.get(left_index).and_then(|key| buckets.get(key));
            for r_tuple in matches.into_iter().flatten() {
                tuples.insert(l_tuple.concat(r_tuple));
            }
        }

        Ok(Relation::unnamed(
            combined_schema(lhs.schema(), rhs.schema()),
            tuples,
        ))
    }

    fn union(&self, left: &Expr, right: &Expr) -> Result<Relation> {
        let (lhs, rhs) = self.same_arity(left, right, |left, right| {
            Error::UnionArityMismatch { left, right }
        })?;

        let mut tuples = lhs.tuples.clone();
        tuples.extend(rhs.tuples().cloned());

        Ok(Relation::unnamed(lhs.schema().without_keys(), tuples))
    }

    fn intersect(&self, left: &Expr, right: &Expr) -> Result<Relation> {
        let (lhs, rhs) = self.same_arity(left, right, |left, right| {
            Error::IntersectionArityMismatch { left, right }
        })?;

        let tuples: TupleSet = lhs
            .tuples()
            .filter(|t| rhs.tuples.contains(*t))
            .cloned()
            .collect();

        Ok(Relation::unnamed(lhs.schema().without_keys(), tuples))
    }

    fn difference(&self, left: &Expr, right: &Expr) -> Result<Relation> {
        let (lhs, rhs) = self.same_arity(left, right, |left, right| {
            Error::DifferenceArityMismatch { left, right }
        })?;

        let tuples: TupleSet = lhs
            .tuples()
            .filter(|t| !rhs.tuples.contains(*t))
            .cloned()
            .collect();

        Ok(Relation::unnamed(lhs.schema().without_keys(), tuples))
    }

    fn product(&self, left: &Expr, right: &Expr) -> Result<Relation> {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;

        let tuples: TupleSet = lhs
            .tuples()
            .flat_map(|l| rhs.tuples().map(move |r| l.concat(r)))
            .collect();

        Ok(Relation::unnamed(
            combined_schema(lhs.schema(), rhs.schema()),
            tuples,
        ))
    }

    /// Evaluate both operands of a set operator and check their arities match
    fn same_arity(
        &self,
        left: &Expr,
        right: &Expr,
        mismatch: impl FnOnce(String, String) -> Error,
    ) -> Result<(Cow<'a, Relation>, Cow<'a, Relation>)> {
        let lhs = self.evaluate(left)?;
        let rhs = self.evaluate(right)?;

        if lhs.arity() != rhs.arity() {
            return Err(mismatch(left.to_string(), right.to_string()));
        }
        Ok((lhs, rhs))
    }
}

/// Left attributes followed by right attributes.
///
/// A right attribute whose name appears among the left names gets
/// [`COLLISION_SUFFIX`] once; the suffixed name is not checked again.
pub fn combined_schema(left: &Schema, right: &Schema) -> Schema {
    let left_names = left.names();
    let names = left_names
        .iter()
        .map(|n| n.to_string())
        .chain(right.names().into_iter().map(|n| {
            if left_names.contains(&n) {
                format!("{}{}", n, COLLISION_SUFFIX)
            } else {
                n.to_string()
            }
        }));
    Schema::plain(names.collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::constraints;
    use crate::catalog::{Attribute, ForeignKey};
    use crate::lang::ast::CheckMode;
    use crate::lang::parse_statement;
    use crate::lang::Statement;
    use crate::tuple;

    fn company() -> Catalog {
        let mut catalog = Catalog::new();
        constraints::define_relations(
            &mut catalog,
            vec![
                Relation::new(
                    "Emp",
                    Schema::from_attributes(vec![
                        Attribute::new("id").primary_key(true),
                        Attribute::new("name"),
                        Attribute::new("dept").foreign_key(true),
                    ]),
                    vec![ForeignKey::new("dept", "Dept", "id")],
                ),
                Relation::new(
                    "Dept",
                    Schema::from_attributes(vec![
                        Attribute::new("id").primary_key(true),
                        Attribute::new("name"),
                    ]),
                    vec![],
                ),
                Relation::new("Mgr", Schema::plain(["id", "name", "dept"]), vec![]),
            ],
        )
        .unwrap();

        let rows = [
            ("Dept", tuple![1, "Eng"]),
            ("Dept", tuple![2, "Ops"]),
            ("Emp", tuple![10, "Ann", 1]),
            ("Emp", tuple![11, "Bob", 2]),
            ("Emp", tuple![12, "Cid", 1]),
            ("Mgr", tuple![10, "Ann", 1]),
            ("Mgr", tuple![20, "Dee", 2]),
        ];
        for (relation, row) in rows {
            constraints::insert(&mut catalog, relation, row.into_values(), CheckMode::Checked)
                .unwrap();
        }
        catalog
    }

    fn eval(catalog: &Catalog, source: &str) -> Result<Relation> {
        let expr = match parse_statement(source).unwrap().node {
            Statement::Evaluate(expr) => expr,
            other => panic!("Expected expression, got {:?}", other),
        };
        Evaluator::new(catalog).evaluate(&expr).map(Cow::into_owned)
    }

    fn rows(relation: &Relation) -> Vec<Tuple> {
        relation.tuples().cloned().collect()
    }

    #[test]
    fn test_relation_reference_is_borrowed() {
        let catalog = company();
        let result = Evaluator::new(&catalog)
            .evaluate(&Expr::relation("Emp"))
            .unwrap();
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_projection_of_restriction() {
        let catalog = company();
        let result = eval(&catalog, "π name (σ dept = 1 (Emp))").unwrap();

        assert_eq!(result.schema().names(), vec!["name"]);
        assert_eq!(rows(&result), vec![tuple!["Ann"], tuple!["Cid"]]);
        assert!(result.name().is_empty());
        assert!(!result.temporary);
    }

    #[test]
    fn test_projection_collapses_duplicates_and_orders_columns() {
        let catalog = company();
        let result = eval(&catalog, "π dept (Emp)").unwrap();
        assert_eq!(rows(&result), vec![tuple![1], tuple![2]]);

        let result = eval(&catalog, "π name, id (Dept)").unwrap();
        assert_eq!(result.schema().names(), vec!["name", "id"]);
        assert_eq!(rows(&result)[0], tuple!["Eng", 1]);
    }

    #[test]
    fn test_projection_on_full_attribute_list_is_identity() {
        let catalog = company();
        let result = eval(&catalog, "π id, name, dept (Emp)").unwrap();
        assert_eq!(rows(&result), rows(catalog.relation("Emp").unwrap()));
    }

    #[test]
    fn test_projection_errors() {
        let catalog = company();
        assert!(matches!(
            eval(&catalog, "π name, salary, bonus (Emp)"),
            Err(Error::ColumnNotFound { relation, columns })
                if relation == "Emp" && columns == vec!["salary", "bonus"]
        ));
        assert!(matches!(
            eval(&catalog, "π name, name (Emp)"),
            Err(Error::DuplicateAttribute { .. })
        ));
        assert!(matches!(
            eval(&catalog, "π name (Nope)"),
            Err(Error::RelationNotFound(name)) if name == "Nope"
        ));
    }

    #[test]
    fn test_restriction() {
        let catalog = company();
        let result = eval(&catalog, "σ id > 10 (Emp)").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.schema().names(), vec!["id", "name", "dept"]);
        assert!(result.schema().primary_key_indices().is_empty());

        let result = eval(&catalog, "σ name != 'Ann' (Emp)").unwrap();
        assert_eq!(result.len(), 2);

        // Incomparable kinds never satisfy an ordering
        let result = eval(&catalog, "σ name < 5 (Emp)").unwrap();
        assert!(result.is_empty());

        assert!(matches!(
            eval(&catalog, "σ salary = 1 (Emp)"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_join() {
        let catalog = company();
        let result = eval(&catalog, "Emp ⋈ Dept | dept = id").unwrap();

        assert_eq!(
            result.schema().names(),
            vec!["id", "name", "dept", "id_", "name_"]
        );
        assert_eq!(
            rows(&result),
            vec![
                tuple![10, "Ann", 1, 1, "Eng"],
                tuple![11, "Bob", 2, 2, "Ops"],
                tuple![12, "Cid", 1, 1, "Eng"],
            ]
        );
    }

    #[test]
    fn test_join_unknown_columns() {
        let catalog = company();
        assert!(matches!(
            eval(&catalog, "Emp ⋈ Dept | boss = id"),
            Err(Error::ColumnNotFound { relation, .. }) if relation == "Emp"
        ));
        assert!(matches!(
            eval(&catalog, "Emp ⋈ Dept | dept = code"),
            Err(Error::ColumnNotFound { relation, .. }) if relation == "Dept"
        ));
    }

    #[test]
    fn test_join_count_matches_equal_pairs() {
        let catalog = company();
        let joined = eval(&catalog, "Emp ⋈ Mgr | dept = dept").unwrap();
        assert_eq!(joined.arity(), 6);

        let emp = catalog.relation("Emp").unwrap();
        let mgr = catalog.relation("Mgr").unwrap();
        let expected = emp
            .tuples()
            .flat_map(|e| mgr.tuples().filter(move |m| e.get(2) == m.get(2)))
            .count();
        assert_eq!(joined.len(), expected);
    }

    #[test]
    fn test_set_operators() {
        let catalog = company();

        let union = eval(&catalog, "Emp ∪ Mgr").unwrap();
        assert_eq!(union.len(), 4);
        assert_eq!(union.schema().names(), vec!["id", "name", "dept"]);

        let intersection = eval(&catalog, "Emp ∩ Mgr").unwrap();
        assert_eq!(rows(&intersection), vec![tuple![10, "Ann", 1]]);

        let difference = eval(&catalog, "Mgr - Emp").unwrap();
        assert_eq!(rows(&difference), vec![tuple![20, "Dee", 2]]);
    }

    #[test]
    fn test_set_operators_reject_unequal_arity() {
        let catalog = company();

        assert!(matches!(
            eval(&catalog, "Emp U Dept"),
            Err(Error::UnionArityMismatch { left, right }) if left == "Emp" && right == "Dept"
        ));
        assert!(matches!(
            eval(&catalog, "Dept ∩ Emp"),
            Err(Error::IntersectionArityMismatch { .. })
        ));
        assert!(matches!(
            eval(&catalog, "π name (Emp) - Dept"),
            Err(Error::DifferenceArityMismatch { left, .. }) if left == "π name (Emp)"
        ));
    }

    #[test]
    fn test_product() {
        let catalog = company();
        let result = eval(&catalog, "Dept X Dept").unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(result.schema().names(), vec!["id", "name", "id_", "name_"]);
        assert_eq!(rows(&result)[1], tuple![1, "Eng", 2, "Ops"]);
    }

    #[test]
    fn test_collision_suffix_is_not_recursive() {
        let left = Schema::plain(["a", "a_"]);
        let right = Schema::plain(["a", "b"]);
        let combined = combined_schema(&left, &right);

        // The suffixed name collides again and is kept as is
        assert_eq!(combined.names(), vec!["a", "a_", "a_", "b"]);
    }

    #[test]
    fn test_operands_are_not_mutated() {
        let catalog = company();
        let before = rows(catalog.relation("Emp").unwrap());
        eval(&catalog, "(Emp - Mgr) ∪ σ id = 10 (Emp)").unwrap();
        assert_eq!(rows(catalog.relation("Emp").unwrap()), before);
    }
}
