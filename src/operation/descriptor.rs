use serde_json::{json, Number, Value};

/// A single field-level mutation descriptor and its wire encoding.
///
/// `Set`/`ForceSet` encode as the raw value; everything else encodes as the
/// server's `{"__op": …}` envelope. `Batch` is a pass-through composite of
/// sub-operations for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Set(Value),
    ForceSet(Value),
    Unset,
    Increment(Number),
    Add(Vec<Value>),
    AddUnique(Vec<Value>),
    Remove(Vec<Value>),
    AddRelation(Vec<Value>),
    RemoveRelation(Vec<Value>),
    Batch(Vec<Op>),
}

impl Op {
    pub fn encode(&self) -> Value {
        match self {
            Op::Set(value) | Op::ForceSet(value) => value.clone(),
            Op::Unset => json!({"__op": "Delete"}),
            Op::Increment(amount) => json!({"__op": "Increment", "amount": amount}),
            Op::Add(objects) => json!({"__op": "Add", "objects": objects}),
            Op::AddUnique(objects) => json!({"__op": "AddUnique", "objects": objects}),
            Op::Remove(objects) => json!({"__op": "Remove", "objects": objects}),
            Op::AddRelation(objects) => json!({"__op": "AddRelation", "objects": objects}),
            Op::RemoveRelation(objects) => json!({"__op": "RemoveRelation", "objects": objects}),
            Op::Batch(ops) => Value::Array(ops.iter().map(Op::encode).collect()),
        }
    }

    /// Fold a later operation of the same kind into this one where that makes
    /// sense (array ops union their objects); otherwise the later one wins.
    pub(crate) fn merged_with(self, later: Op) -> Op {
        match (self, later) {
            (Op::Add(mut a), Op::Add(b)) => {
                a.extend(b);
                Op::Add(a)
            }
            (Op::AddUnique(mut a), Op::AddUnique(b)) => {
                for value in b {
                    if !a.contains(&value) {
                        a.push(value);
                    }
                }
                Op::AddUnique(a)
            }
            (Op::Remove(mut a), Op::Remove(b)) => {
                for value in b {
                    if !a.contains(&value) {
                        a.push(value);
                    }
                }
                Op::Remove(a)
            }
            (Op::AddRelation(mut a), Op::AddRelation(b)) => {
                for value in b {
                    if !a.contains(&value) {
                        a.push(value);
                    }
                }
                Op::AddRelation(a)
            }
            (Op::RemoveRelation(mut a), Op::RemoveRelation(b)) => {
                for value in b {
                    if !a.contains(&value) {
                        a.push(value);
                    }
                }
                Op::RemoveRelation(a)
            }
            (_, later) => later,
        }
    }
}
