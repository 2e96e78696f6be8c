//! Typed records and their save/fetch/delete capabilities.

mod acl;
mod field;
mod pointer;

pub use acl::Acl;
pub use field::FieldRef;
pub use pointer::Pointer;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use async_trait::async_trait;

use crate::api::{CachePolicy, Command, Endpoint, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::codec::{self, CreateResponse};
use crate::error::{Error, Result};

/// A typed record: a struct with the server-owned bookkeeping fields plus any
/// number of user-declared fields.
///
/// A record is "saved" iff it has an object id; only saved records can be
/// referenced by a [`Pointer`]. `original_data` is the opaque snapshot of the
/// last state the server confirmed, used to decide merge conflicts on fetch.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const CLASS_NAME: &'static str;
    const ENDPOINT: Endpoint = Endpoint::Objects;

    fn object_id(&self) -> Option<&str>;
    fn set_object_id(&mut self, object_id: Option<String>);
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn set_created_at(&mut self, created_at: Option<DateTime<Utc>>);
    fn updated_at(&self) -> Option<DateTime<Utc>>;
    fn set_updated_at(&mut self, updated_at: Option<DateTime<Utc>>);
    fn original_data(&self) -> Option<&Value>;
    fn set_original_data(&mut self, original: Option<Value>);

    /// Access-control descriptor, when the record carries one. Travels in the
    /// save body like any other field; enforcement is entirely server-side.
    fn acl(&self) -> Option<&Acl> {
        None
    }
    fn set_acl(&mut self, _acl: Option<Acl>) {}

    fn is_saved(&self) -> bool {
        self.object_id().is_some()
    }

    fn class_path() -> String {
        Self::ENDPOINT.class_path(Self::CLASS_NAME)
    }

    fn instance_path(&self) -> Result<String> {
        let id = self.object_id().ok_or(Error::MissingObjectId)?;
        Ok(Self::ENDPOINT.instance_path(Self::CLASS_NAME, id))
    }
}

/// Records that can be created/updated server-side.
#[async_trait]
pub trait Savable: Record {
    async fn save(&self, client: &Client) -> Result<Self> {
        self.save_with_options(client, &RequestOptions::new()).await
    }

    async fn save_with_options(&self, client: &Client, options: &RequestOptions) -> Result<Self> {
        save_record(self, client, options).await
    }
}

/// Records that can be re-fetched, merging the server state with local edits.
#[async_trait]
pub trait Fetchable: Record {
    async fn fetch(&self, client: &Client) -> Result<Self> {
        self.fetch_with_options(client, &RequestOptions::new()).await
    }

    async fn fetch_with_options(&self, client: &Client, options: &RequestOptions) -> Result<Self> {
        let path = self.instance_path()?;
        let command = Command::new(Method::Get, path, |bytes| {
            codec::decode_body::<Map<String, Value>>(bytes)
        });
        let server = command.execute(client, options).await?;
        merge_fetched(self, server)
    }
}

/// Records that can be deleted server-side.
#[async_trait]
pub trait Deletable: Record {
    async fn delete(&self, client: &Client) -> Result<()> {
        self.delete_with_options(client, &RequestOptions::new()).await
    }

    async fn delete_with_options(&self, client: &Client, options: &RequestOptions) -> Result<()> {
        let path = self.instance_path()?;
        let command = Command::new(Method::Delete, path, |_| Ok(()));
        command.execute(client, options).await
    }
}

/// Whole-record save: POST when the record has no id yet, PUT otherwise.
pub(crate) async fn save_record<R: Record>(
    record: &R,
    client: &Client,
    user_options: &RequestOptions,
) -> Result<R> {
    // Cache policy goes in before user options; with first-insert-wins union
    // a caller-supplied cache policy is ignored here. Long-standing contract.
    let mut options = RequestOptions::new().with(RequestOption::CachePolicy(CachePolicy::NoCache));
    options.union(user_options);

    let body = codec::to_body(record)?;

    if record.is_saved() {
        let path = record.instance_path()?;
        let command = Command::new(Method::Put, path, |bytes| {
            codec::decode_body::<Map<String, Value>>(bytes)
        })
        .body(Value::Object(body.clone()));
        let envelope = command.execute(client, &options).await?;
        apply_update(record, body, envelope)
    } else {
        let command = Command::new(Method::Post, R::class_path(), |bytes| {
            codec::decode_body::<CreateResponse>(bytes)
        })
        .body(Value::Object(body.clone()));
        let echo = command.execute(client, &options).await?;

        let mut saved = record.clone();
        saved.set_object_id(Some(echo.object_id));
        saved.set_created_at(echo.created_at);
        saved.set_updated_at(echo.created_at);
        saved.set_original_data(Some(Value::Object(body)));
        Ok(saved)
    }
}

/// Apply an update envelope (`updatedAt` plus the server-computed values of
/// changed fields) onto a record. All-or-nothing: any decode failure leaves
/// the caller with its original record via the error branch.
pub(crate) fn apply_update<R: Record>(
    record: &R,
    sent_body: Map<String, Value>,
    envelope: Map<String, Value>,
) -> Result<R> {
    let mut full = match codec::to_wire(record)? {
        Value::Object(map) => map,
        _ => return Err(Error::Decode("record must encode to an object".to_string())),
    };
    for (key, value) in &envelope {
        full.insert(key.clone(), value.clone());
    }
    let mut updated: R = codec::from_wire(Value::Object(full))?;

    // The new known-server-state is what we sent, corrected by what the
    // server says it actually persisted.
    let mut original = sent_body;
    for (key, value) in envelope {
        if !codec::RESERVED_KEYS.contains(&key.as_str()) {
            original.insert(key, value);
        }
    }
    updated.set_original_data(Some(Value::Object(original)));
    Ok(updated)
}

/// Merge a freshly-fetched server representation with local state.
///
/// Conflict policy: a field the caller changed locally (differs from
/// `original_data`) keeps its local value unless the server value moved away
/// from `original_data` too: the server wins only when it actually changed.
pub(crate) fn merge_fetched<R: Record>(local: &R, server: Map<String, Value>) -> Result<R> {
    let local_map = match codec::to_wire(local)? {
        Value::Object(map) => map,
        _ => return Err(Error::Decode("record must encode to an object".to_string())),
    };

    let original = local
        .original_data()
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let mut result = server.clone();
    if local.original_data().is_some() {
        for (key, local_value) in &local_map {
            if codec::RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let original_value = original.get(key);
            let server_value = server.get(key);
            let locally_changed = original_value != Some(local_value);
            let server_changed = server_value != original_value;
            if locally_changed && !server_changed {
                result.insert(key.clone(), local_value.clone());
            }
        }
    }

    let mut merged: R = codec::from_wire(Value::Object(result))?;
    let mut snapshot = server;
    for key in codec::RESERVED_KEYS {
        snapshot.remove(key);
    }
    merged.set_original_data(Some(Value::Object(snapshot)));
    Ok(merged)
}
