//! Meridian Rust Client
//!
//! Typed client for Meridian backend services: objects, queries, files,
//! cloud functions, schema and analytics over HTTP.
//!
//! Records are plain structs implementing [`Record`]; edits can go out as
//! whole-record saves or as minimal field-level diffs through an
//! [`Operation`]; reads go through the immutable [`Query`] builder. All three
//! compile to the same [`Command`] dispatch unit.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{DateTime, Utc};
//! use meridian_client::{gt, ClientBuilder, FieldRef, Operation, Query, Record, Savable};
//! use serde::{Deserialize, Serialize};
//! use serde_json::Value;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! struct Player {
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     object_id: Option<String>,
//!     #[serde(
//!         with = "meridian_client::codec::iso8601_opt",
//!         skip_serializing_if = "Option::is_none",
//!         default
//!     )]
//!     created_at: Option<DateTime<Utc>>,
//!     #[serde(
//!         with = "meridian_client::codec::iso8601_opt",
//!         skip_serializing_if = "Option::is_none",
//!         default
//!     )]
//!     updated_at: Option<DateTime<Utc>>,
//!     #[serde(skip)]
//!     original_data: Option<Value>,
//!     #[serde(skip_serializing_if = "Option::is_none", default)]
//!     score: Option<i64>,
//! }
//!
//! impl Record for Player {
//!     const CLASS_NAME: &'static str = "Player";
//!
//!     fn object_id(&self) -> Option<&str> {
//!         self.object_id.as_deref()
//!     }
//!     fn set_object_id(&mut self, object_id: Option<String>) {
//!         self.object_id = object_id;
//!     }
//!     fn created_at(&self) -> Option<DateTime<Utc>> {
//!         self.created_at
//!     }
//!     fn set_created_at(&mut self, created_at: Option<DateTime<Utc>>) {
//!         self.created_at = created_at;
//!     }
//!     fn updated_at(&self) -> Option<DateTime<Utc>> {
//!         self.updated_at
//!     }
//!     fn set_updated_at(&mut self, updated_at: Option<DateTime<Utc>>) {
//!         self.updated_at = updated_at;
//!     }
//!     fn original_data(&self) -> Option<&Value> {
//!         self.original_data.as_ref()
//!     }
//!     fn set_original_data(&mut self, original: Option<Value>) {
//!         self.original_data = original;
//!     }
//! }
//!
//! impl meridian_client::Savable for Player {}
//!
//! const SCORE: FieldRef<Player, i64> =
//!     FieldRef::new("score", |r| r.score.as_ref(), |r, v| r.score = v);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), meridian_client::Error> {
//!     let client = ClientBuilder::new("https://api.example.com/1", "my-app-id")
//!         .client_key("my-client-key")
//!         .build()?;
//!
//!     let player = Player {
//!         object_id: None,
//!         created_at: None,
//!         updated_at: None,
//!         original_data: None,
//!         score: Some(10),
//!     };
//!     let saved = player.save(&client).await?;
//!
//!     // Field-level diff: only the increment travels.
//!     let updated = Operation::new(&saved)
//!         .increment("score", 5)
//!         .save(&client)
//!         .await?;
//!
//!     let top: Vec<Player> = Query::<Player>::new()
//!         .filter(gt("score", 10))
//!         .limit(25)
//!         .find(&client)
//!         .await?;
//!
//!     println!("updated: {:?}, found {}", updated.score, top.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod codec;
pub mod error;
pub mod object;
pub mod operation;
pub mod query;
pub mod services;

pub use api::{
    CachePolicy, CancellationToken, Command, Endpoint, HttpTransport, Method, ProgressFn,
    RequestOption, RequestOptions, Transport, TransportRequest, TransportResponse,
};
pub use client::{surface, Client, ClientBuilder, ClientConfig, LocalStorage};
pub use error::{Error, Result};
pub use object::{Acl, Deletable, Fetchable, FieldRef, Pointer, Record, Savable};
pub use operation::{Op, Operation};
pub use query::{
    and, contained_in, contains_all, eq, exists, gt, gte, lt, lte, matches_regex, ne,
    not_contained_in, or, related_to, Constraint, Order, Query,
};
pub use services::{CloudConfigUpdate, File, Schema, ServerHealth, ServerInfo};
