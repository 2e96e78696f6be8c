use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Record;
use crate::api::{Command, Method, RequestOptions};
use crate::client::Client;
use crate::codec;
use crate::error::{Error, Result};

/// Lightweight reference to a saved record: class plus id. Encodes as the
/// `{"__type":"Pointer"}` envelope and resolves back to the full record with
/// [`Pointer::fetch`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "Pointer")]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Pointer<R> {
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "objectId")]
    pub object_id: String,
    #[serde(skip)]
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for Pointer<R> {
    fn clone(&self) -> Self {
        Self {
            class_name: self.class_name.clone(),
            object_id: self.object_id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R> PartialEq for Pointer<R> {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name && self.object_id == other.object_id
    }
}

impl<R: Record> Pointer<R> {
    /// Reference a saved record. Fails with `MissingObjectId` for unsaved
    /// records; only saved records are addressable.
    pub fn try_from_record(record: &R) -> Result<Self> {
        let object_id = record.object_id().ok_or(Error::MissingObjectId)?;
        Ok(Self {
            class_name: R::CLASS_NAME.to_string(),
            object_id: object_id.to_string(),
            _marker: PhantomData,
        })
    }

    pub fn from_object_id(object_id: impl Into<String>) -> Self {
        Self {
            class_name: R::CLASS_NAME.to_string(),
            object_id: object_id.into(),
            _marker: PhantomData,
        }
    }

    /// Resolve the pointer into the full record.
    pub async fn fetch(&self, client: &Client) -> Result<R> {
        self.fetch_with_options(client, &RequestOptions::new()).await
    }

    pub async fn fetch_with_options(
        &self,
        client: &Client,
        options: &RequestOptions,
    ) -> Result<R> {
        let path = R::ENDPOINT.instance_path(R::CLASS_NAME, &self.object_id);
        let command = Command::new(Method::Get, path, |bytes| {
            codec::decode_body::<Map<String, Value>>(bytes)
        });
        let server = command.execute(client, options).await?;
        // No local copy to reconcile with: decode server state directly.
        let mut fetched: R = codec::from_wire(Value::Object(server.clone()))?;
        let mut snapshot = server;
        for key in codec::RESERVED_KEYS {
            snapshot.remove(key);
        }
        fetched.set_original_data(Some(Value::Object(snapshot)));
        Ok(fetched)
    }
}
