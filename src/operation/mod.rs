//! The field-level diff engine.
//!
//! An [`Operation`] accumulates mutations against one record, compiles them
//! into a minimal wire payload and, on save, merges the server's response back
//! into the original record. Construct one per logical edit session; `save`
//! consumes it.

mod descriptor;

pub use descriptor::Op;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::api::{CachePolicy, Command, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::codec;
use crate::error::{Error, Result};
use crate::object::{apply_update, save_record, FieldRef, Pointer, Record};

const COMBINE_ERROR: &str =
    "cannot combine a whole-record set with per-field operations in one operation";

/// Accumulated field-level mutations for one record.
///
/// The target copy carries local mutations as they are recorded (so UIs can
/// render optimistically); the original copy is kept untouched as the base
/// the server response merges onto. Value semantics throughout: every builder
/// method consumes and returns the operation.
pub struct Operation<R: Record> {
    target: R,
    original: R,
    ops: HashMap<String, Op>,
    nulls: HashSet<String>,
    whole_record: bool,
}

impl<R: Record> Operation<R> {
    pub fn new(record: &R) -> Self {
        Self {
            target: record.clone(),
            original: record.clone(),
            ops: HashMap::new(),
            nulls: HashSet::new(),
            whole_record: false,
        }
    }

    /// The record with local mutations applied.
    pub fn target(&self) -> &R {
        &self.target
    }

    fn record_op(&mut self, key: &str, op: Op) {
        self.nulls.remove(key);
        let op = match self.ops.remove(key) {
            Some(existing) => existing.merged_with(op),
            None => op,
        };
        self.ops.insert(key.to_string(), op);
    }

    fn record_null(&mut self, key: &str) {
        self.ops.remove(key);
        self.nulls.insert(key.to_string());
    }

    /// Set a field. Equal old/new values record nothing; setting a previously
    /// non-nil field to `None` records an explicit null.
    pub fn set<V>(mut self, field: FieldRef<R, V>, value: Option<V>) -> Result<Self>
    where
        V: Serialize + PartialEq + Clone,
    {
        let old = (field.get)(&self.target);
        let unchanged = match (&old, &value) {
            (None, None) => true,
            (Some(o), Some(n)) => *o == n,
            _ => false,
        };
        if unchanged {
            return Ok(self);
        }
        match &value {
            Some(v) => {
                let wire = codec::to_wire(v)?;
                self.record_op(field.key, Op::Set(wire));
            }
            None => self.record_null(field.key),
        }
        (field.set)(&mut self.target, value);
        Ok(self)
    }

    /// Set a field unconditionally, even when the value is unchanged.
    pub fn force_set<V>(mut self, field: FieldRef<R, V>, value: Option<V>) -> Result<Self>
    where
        V: Serialize + Clone,
    {
        match &value {
            Some(v) => {
                let wire = codec::to_wire(v)?;
                self.record_op(field.key, Op::ForceSet(wire));
            }
            None => self.record_null(field.key),
        }
        (field.set)(&mut self.target, value);
        Ok(self)
    }

    /// Replace the whole record (full-object save). Not combinable with
    /// per-field operations.
    pub fn set_whole(mut self, record: R) -> Self {
        self.whole_record = true;
        self.target = record;
        self
    }

    /// Delete a field server-side without touching the local copy.
    pub fn unset(mut self, key: &str) -> Self {
        self.record_op(key, Op::Unset);
        self
    }

    /// Delete a field server-side and nil it locally.
    pub fn unset_field<V>(mut self, field: FieldRef<R, V>) -> Self {
        self.record_op(field.key, Op::Unset);
        (field.set)(&mut self.target, None);
        self
    }

    /// Increment a numeric field. The delta is not applied locally; the
    /// server computes the result and the save merge brings it back.
    pub fn increment(mut self, key: &str, amount: i64) -> Self {
        self.record_op(key, Op::Increment(Number::from(amount)));
        self
    }

    pub fn increment_double(mut self, key: &str, amount: f64) -> Result<Self> {
        let amount = Number::from_f64(amount)
            .ok_or_else(|| Error::OtherCause("increment amount must be finite".to_string()))?;
        self.record_op(key, Op::Increment(amount));
        Ok(self)
    }

    /// Append values to an array field.
    pub fn add<V>(mut self, field: FieldRef<R, Vec<V>>, objects: &[V]) -> Result<Self>
    where
        V: Serialize + PartialEq + Clone,
    {
        let wire = objects.iter().map(codec::to_wire).collect::<Result<_>>()?;
        self.record_op(field.key, Op::Add(wire));
        let mut current = (field.get)(&self.target).cloned().unwrap_or_default();
        current.extend_from_slice(objects);
        (field.set)(&mut self.target, Some(current));
        Ok(self)
    }

    /// Append values to an array field, skipping values already present
    /// (set semantics).
    pub fn add_unique<V>(mut self, field: FieldRef<R, Vec<V>>, objects: &[V]) -> Result<Self>
    where
        V: Serialize + PartialEq + Clone,
    {
        let mut current = (field.get)(&self.target).cloned().unwrap_or_default();
        let mut wire = Vec::new();
        for object in objects {
            if !current.contains(object) {
                wire.push(codec::to_wire(object)?);
                current.push(object.clone());
            }
        }
        self.record_op(field.key, Op::AddUnique(wire));
        (field.set)(&mut self.target, Some(current));
        Ok(self)
    }

    /// Remove all matching values from an array field (set difference).
    pub fn remove<V>(mut self, field: FieldRef<R, Vec<V>>, objects: &[V]) -> Result<Self>
    where
        V: Serialize + PartialEq + Clone,
    {
        let wire = objects.iter().map(codec::to_wire).collect::<Result<_>>()?;
        self.record_op(field.key, Op::Remove(wire));
        let current = (field.get)(&self.target).cloned().unwrap_or_default();
        let remaining: Vec<V> = current
            .into_iter()
            .filter(|v| !objects.contains(v))
            .collect();
        (field.set)(&mut self.target, Some(remaining));
        Ok(self)
    }

    /// Relate saved records to this one. Relata must be saved; their pointers
    /// are appended locally.
    pub fn add_relation<O: Record>(
        mut self,
        field: FieldRef<R, Vec<Pointer<O>>>,
        objects: &[O],
    ) -> Result<Self> {
        let pointers = objects
            .iter()
            .map(Pointer::try_from_record)
            .collect::<Result<Vec<_>>>()?;
        let wire = pointers.iter().map(codec::to_wire).collect::<Result<_>>()?;
        self.record_op(field.key, Op::AddRelation(wire));
        let mut current = (field.get)(&self.target).cloned().unwrap_or_default();
        for pointer in pointers {
            if !current.contains(&pointer) {
                current.push(pointer);
            }
        }
        (field.set)(&mut self.target, Some(current));
        Ok(self)
    }

    /// Unrelate saved records from this one.
    pub fn remove_relation<O: Record>(
        mut self,
        field: FieldRef<R, Vec<Pointer<O>>>,
        objects: &[O],
    ) -> Result<Self> {
        let pointers = objects
            .iter()
            .map(Pointer::try_from_record)
            .collect::<Result<Vec<_>>>()?;
        let wire = pointers.iter().map(codec::to_wire).collect::<Result<_>>()?;
        self.record_op(field.key, Op::RemoveRelation(wire));
        let current = (field.get)(&self.target).cloned().unwrap_or_default();
        let remaining: Vec<Pointer<O>> = current
            .into_iter()
            .filter(|p| !pointers.contains(p))
            .collect();
        (field.set)(&mut self.target, Some(remaining));
        Ok(self)
    }

    /// Record a composite of sub-operations for one field.
    pub fn batch(mut self, key: &str, ops: Vec<Op>) -> Self {
        self.record_op(key, Op::Batch(ops));
        self
    }

    fn has_keyed_operations(&self) -> bool {
        !self.ops.is_empty() || !self.nulls.is_empty()
    }

    /// Compile the accumulated diff into the update body: one entry per
    /// operation key plus an explicit null per nulled key. Key order is
    /// unspecified.
    pub fn encode(&self) -> Result<Value> {
        if self.whole_record && self.has_keyed_operations() {
            return Err(Error::OtherCause(COMBINE_ERROR.to_string()));
        }
        let mut body = Map::new();
        for (key, op) in &self.ops {
            body.insert(key.clone(), op.encode());
        }
        for key in &self.nulls {
            body.insert(key.clone(), Value::Null);
        }
        Ok(Value::Object(body))
    }

    pub async fn save(self, client: &Client) -> Result<R> {
        self.save_with_options(client, &RequestOptions::new()).await
    }

    /// Save the accumulated diff.
    ///
    /// Decision branch:
    /// 1. unsaved target → `MissingObjectId`;
    /// 2. whole-record set combined with keyed operations → `OtherCause`;
    /// 3. never-synced target with no keyed operations (or an explicit
    ///    whole-record set) → plain full-record save;
    /// 4. otherwise PUT the encoded diff (the backend has no PATCH) and merge
    ///    the response envelope onto the untouched original.
    pub async fn save_with_options(
        self,
        client: &Client,
        user_options: &RequestOptions,
    ) -> Result<R> {
        if self.target.object_id().is_none() {
            return Err(Error::MissingObjectId);
        }
        if self.whole_record && self.has_keyed_operations() {
            return Err(Error::OtherCause(COMBINE_ERROR.to_string()));
        }
        if self.whole_record
            || (self.target.original_data().is_none() && !self.has_keyed_operations())
        {
            return save_record(&self.target, client, user_options).await;
        }

        // Same cache-policy-before-user-options ordering as the other save
        // call sites; a caller-supplied cache policy is ignored here.
        let mut options =
            RequestOptions::new().with(RequestOption::CachePolicy(CachePolicy::NoCache));
        options.union(user_options);

        let body = self.encode()?;
        let path = self.original.instance_path()?;
        let command = Command::new(Method::Put, path, |bytes| {
            codec::decode_body::<Map<String, Value>>(bytes)
        })
        .body(body);
        let envelope = command.execute(client, &options).await?;

        let base = match self.original.original_data().and_then(|v| v.as_object()) {
            Some(map) => map.clone(),
            None => codec::to_body(&self.original)?,
        };
        apply_update(&self.original, base, envelope)
    }
}
