use serde_json::{json, Map, Value};

use crate::codec;
use crate::error::Result;
use crate::object::{Pointer, Record};

/// One node of the `where` tree: a key compared against a value, either
/// directly (equality) or through a `$`-operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub(crate) key: String,
    pub(crate) comparator: Option<&'static str>,
    pub(crate) value: Value,
}

impl Constraint {
    fn new(key: &str, comparator: Option<&'static str>, value: Value) -> Self {
        Self {
            key: key.to_string(),
            comparator,
            value,
        }
    }
}

pub fn eq(key: &str, value: impl Into<Value>) -> Constraint {
    Constraint::new(key, None, value.into())
}

pub fn ne(key: &str, value: impl Into<Value>) -> Constraint {
    Constraint::new(key, Some("$ne"), value.into())
}

pub fn lt(key: &str, value: impl Into<Value>) -> Constraint {
    Constraint::new(key, Some("$lt"), value.into())
}

pub fn lte(key: &str, value: impl Into<Value>) -> Constraint {
    Constraint::new(key, Some("$lte"), value.into())
}

pub fn gt(key: &str, value: impl Into<Value>) -> Constraint {
    Constraint::new(key, Some("$gt"), value.into())
}

pub fn gte(key: &str, value: impl Into<Value>) -> Constraint {
    Constraint::new(key, Some("$gte"), value.into())
}

pub fn contained_in(key: &str, values: Vec<impl Into<Value>>) -> Constraint {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Constraint::new(key, Some("$in"), Value::Array(values))
}

pub fn not_contained_in(key: &str, values: Vec<impl Into<Value>>) -> Constraint {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Constraint::new(key, Some("$nin"), Value::Array(values))
}

pub fn contains_all(key: &str, values: Vec<impl Into<Value>>) -> Constraint {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    Constraint::new(key, Some("$all"), Value::Array(values))
}

pub fn exists(key: &str, value: bool) -> Constraint {
    Constraint::new(key, Some("$exists"), Value::Bool(value))
}

pub fn matches_regex(key: &str, regex: &str) -> Constraint {
    Constraint::new(key, Some("$regex"), Value::String(regex.to_string()))
}

/// Constrain to records related to `record` through its `key` relation.
pub fn related_to<R: Record>(key: &str, record: &R) -> Result<Constraint> {
    let pointer = Pointer::try_from_record(record)?;
    Ok(Constraint::new(
        "$relatedTo",
        None,
        json!({"object": codec::to_wire(&pointer)?, "key": key}),
    ))
}

/// Match any of the given constraint groups.
pub fn or(groups: Vec<Vec<Constraint>>) -> Constraint {
    let folded: Vec<Value> = groups
        .iter()
        .map(|g| Value::Object(fold_constraints(g)))
        .collect();
    Constraint::new("$or", None, Value::Array(folded))
}

/// Match all of the given constraint groups.
pub fn and(groups: Vec<Vec<Constraint>>) -> Constraint {
    let folded: Vec<Value> = groups
        .iter()
        .map(|g| Value::Object(fold_constraints(g)))
        .collect();
    Constraint::new("$and", None, Value::Array(folded))
}

/// Fold a constraint list into the canonical `where` map. Operator
/// constraints on the same key merge into one sub-object; a direct equality
/// displaces whatever was there.
pub(crate) fn fold_constraints(constraints: &[Constraint]) -> Map<String, Value> {
    let mut tree = Map::new();
    for constraint in constraints {
        match constraint.comparator {
            None => {
                tree.insert(constraint.key.clone(), constraint.value.clone());
            }
            Some(op) => match tree.get_mut(&constraint.key) {
                Some(Value::Object(existing)) => {
                    existing.insert(op.to_string(), constraint.value.clone());
                }
                _ => {
                    let mut sub = Map::new();
                    sub.insert(op.to_string(), constraint.value.clone());
                    tree.insert(constraint.key.clone(), Value::Object(sub));
                }
            },
        }
    }
    tree
}
