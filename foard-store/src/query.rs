//! Query shapes and evaluation.
//!
//! Queries support top-level equality filters and ordering by one field,
//! which is all the client needs: task collections are read ordered by
//! `order` ascending, memberships and invites by equality on a field.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::document::{Document, Fields};

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest value first.
    Ascending,
    /// Largest value first.
    Descending,
}

/// An equality predicate on a top-level field.
#[derive(Debug, Clone)]
pub struct Filter {
    field: String,
    equals: Value,
}

/// Ordering on a top-level field.
#[derive(Debug, Clone)]
pub struct OrderBy {
    field: String,
    direction: Direction,
}

/// A query over one collection.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) collection: String,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
}

impl Query {
    /// A query matching every document of a collection, in key order.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order: None,
        }
    }

    /// Adds an equality filter on a top-level field.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, equals: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            equals: equals.into(),
        });
        self
    }

    /// Orders results by a top-level field, ties broken by document key.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Evaluates the query against one collection's documents.
    pub(crate) fn eval(&self, docs: &BTreeMap<String, Fields>) -> Vec<Document> {
        let mut out: Vec<Document> = docs
            .iter()
            .filter(|(_, data)| {
                self.filters
                    .iter()
                    .all(|f| data.get(&f.field) == Some(&f.equals))
            })
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();
        if let Some(order) = &self.order {
            out.sort_by(|a, b| {
                let av = a.data.get(&order.field);
                let bv = b.data.get(&order.field);
                let cmp = compare_values(av, bv).then_with(|| a.id.cmp(&b.id));
                match order.direction {
                    Direction::Ascending => cmp,
                    Direction::Descending => cmp.reverse(),
                }
            });
        }
        out
    }
}

/// Total order over JSON field values: null < bool < number < string; other
/// shapes compare equal (nothing in the data model orders by them).
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
