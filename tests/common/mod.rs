//! Shared fixtures: a scripted transport and a sample record type.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use meridian_client::{
    Acl, CancellationToken, Client, ClientBuilder, Endpoint, Error, FieldRef, Pointer, ProgressFn,
    Record, Result, Transport, TransportRequest, TransportResponse,
};

/// Transport replaying canned responses in order and recording every request.
pub struct MockTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
    uploads: Mutex<Vec<Vec<u8>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        })
    }

    pub fn push_ok(&self, body: Value) {
        self.push(200, body.to_string().into_bytes());
    }

    pub fn push(&self, status: u16, body: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(TransportResponse { status, body });
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.uploads.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<TransportResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Connection("mock transport has no more responses".to_string()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        self.next_response()
    }

    async fn download(
        &self,
        request: TransportRequest,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        let response = self.next_response()?;
        let total = response.body.len() as u64;
        let mut delivered = 0u64;
        // Deliver in small chunks so cancellation and progress are observable.
        for chunk in response.body.chunks(4) {
            if cancel.is_cancelled() {
                return Err(Error::OtherCause("transfer cancelled".to_string()));
            }
            delivered += chunk.len() as u64;
            if let Some(progress) = &progress {
                progress(delivered, Some(total));
            }
        }
        Ok(response)
    }

    async fn upload(
        &self,
        request: TransportRequest,
        data: Vec<u8>,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        if cancel.is_cancelled() {
            return Err(Error::OtherCause("transfer cancelled".to_string()));
        }
        let total = data.len() as u64;
        self.uploads.lock().unwrap().push(data);
        if let Some(progress) = &progress {
            progress(total, Some(total));
        }
        self.next_response()
    }
}

pub fn test_client(transport: Arc<MockTransport>) -> Client {
    ClientBuilder::new("http://localhost:1337/api", "test-app")
        .client_key("test-client-key")
        .primary_key("test-primary-key")
        .transport(transport)
        .build()
        .unwrap()
}

pub fn test_client_post_queries(transport: Arc<MockTransport>) -> Client {
    ClientBuilder::new("http://localhost:1337/api", "test-app")
        .client_key("test-client-key")
        .primary_key("test-primary-key")
        .use_post_for_query(true)
        .transport(transport)
        .build()
        .unwrap()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(
        with = "meridian_client::codec::iso8601_opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        with = "meridian_client::codec::iso8601_opt",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub original_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub acl: Option<Acl>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rivals: Option<Vec<Pointer<Player>>>,
}

impl Player {
    pub fn new(name: &str, score: i64) -> Self {
        Self {
            object_id: None,
            created_at: None,
            updated_at: None,
            original_data: None,
            acl: None,
            name: Some(name.to_string()),
            score: Some(score),
            tags: None,
            rivals: None,
        }
    }

    pub fn saved(object_id: &str, name: &str, score: i64) -> Self {
        let mut player = Self::new(name, score);
        player.object_id = Some(object_id.to_string());
        player
    }
}

impl Record for Player {
    const CLASS_NAME: &'static str = "Player";
    const ENDPOINT: Endpoint = Endpoint::Objects;

    fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }
    fn set_object_id(&mut self, object_id: Option<String>) {
        self.object_id = object_id;
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
    fn set_created_at(&mut self, created_at: Option<DateTime<Utc>>) {
        self.created_at = created_at;
    }
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
    fn set_updated_at(&mut self, updated_at: Option<DateTime<Utc>>) {
        self.updated_at = updated_at;
    }
    fn original_data(&self) -> Option<&Value> {
        self.original_data.as_ref()
    }
    fn set_original_data(&mut self, original: Option<Value>) {
        self.original_data = original;
    }
    fn acl(&self) -> Option<&Acl> {
        self.acl.as_ref()
    }
    fn set_acl(&mut self, acl: Option<Acl>) {
        self.acl = acl;
    }
}

impl meridian_client::Savable for Player {}
impl meridian_client::Fetchable for Player {}
impl meridian_client::Deletable for Player {}

pub const SCORE: FieldRef<Player, i64> =
    FieldRef::new("score", |r| r.score.as_ref(), |r, v| r.score = v);
pub const NAME: FieldRef<Player, String> =
    FieldRef::new("name", |r| r.name.as_ref(), |r, v| r.name = v);
pub const TAGS: FieldRef<Player, Vec<String>> =
    FieldRef::new("tags", |r| r.tags.as_ref(), |r, v| r.tags = v);
pub const RIVALS: FieldRef<Player, Vec<Pointer<Player>>> =
    FieldRef::new("rivals", |r| r.rivals.as_ref(), |r, v| r.rivals = v);

/// Pull a named parameter out of a recorded GET request.
pub fn param<'a>(request: &'a TransportRequest, key: &str) -> Option<&'a str> {
    request
        .params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
