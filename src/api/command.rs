use serde_json::Value;
use tracing::{debug, warn};

use super::{
    CancellationToken, Method, ProgressFn, RequestOptions, TransportRequest, TransportResponse,
};
use crate::client::Client;
use crate::error::{Error, Result};

/// The uniform dispatch unit. Operations, queries and the auxiliary services
/// all compile into one of these; a command carries everything needed to hit
/// the wire plus a mapper turning raw bytes into the typed result.
///
/// The body is an already-encoded JSON value, which covers both shapes the
/// API uses: record-bodied commands (create/update, body is the record's own
/// fields) and arbitrary payloads (queries, config, analytics).
pub struct Command<U> {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: Option<Value>,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) options: RequestOptions,
    /// When set, `path` is a full URL (file downloads live outside the API
    /// mount point).
    pub(crate) absolute: bool,
    #[allow(clippy::type_complexity)]
    pub(crate) mapper: Box<dyn Fn(&[u8]) -> Result<U> + Send + Sync>,
}

impl<U> Command<U> {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        mapper: impl Fn(&[u8]) -> Result<U> + Send + Sync + 'static,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            params: Vec::new(),
            options: RequestOptions::new(),
            absolute: false,
            mapper: Box::new(mapper),
        }
    }

    /// Treat the path as a complete URL instead of a path under the API base.
    pub fn absolute(mut self) -> Self {
        self.absolute = true;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    fn request(&self, client: &Client, extra: &RequestOptions) -> Result<TransportRequest> {
        let mut options = self.options.clone();
        options.union(extra);

        let mut headers = client.default_headers();
        headers.extend(options.headers(client.config())?);

        let url = if self.absolute {
            self.path.clone()
        } else {
            format!("{}{}", client.config().server_url, self.path)
        };

        Ok(TransportRequest {
            method: self.method,
            url,
            params: self.params.clone(),
            body: self.body.clone(),
            headers,
        })
    }

    fn map_response(&self, response: TransportResponse) -> Result<U> {
        if !response.is_success() {
            let err = Error::from_response(response.status, &response.body);
            warn!(status = response.status, path = %self.path, "command failed");
            return Err(err);
        }
        (self.mapper)(&response.body)
    }

    /// Dispatch through the client's transport and decode the response.
    /// Independent commands may execute concurrently; a command holds no
    /// shared mutable state.
    pub async fn execute(&self, client: &Client, extra: &RequestOptions) -> Result<U> {
        let request = self.request(client, extra)?;
        debug!(method = request.method.as_str(), path = %self.path, "executing command");
        let response = client.transport().execute(request).await?;
        self.map_response(response)
    }

    /// Download variant with streamed progress and cancellation.
    pub async fn execute_download(
        &self,
        client: &Client,
        extra: &RequestOptions,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<U> {
        let request = self.request(client, extra)?;
        debug!(path = %self.path, "executing download");
        let response = client.transport().download(request, progress, cancel).await?;
        self.map_response(response)
    }

    /// Upload variant carrying raw bytes instead of a JSON body.
    pub async fn execute_upload(
        &self,
        client: &Client,
        extra: &RequestOptions,
        data: Vec<u8>,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<U> {
        let request = self.request(client, extra)?;
        debug!(path = %self.path, bytes = data.len(), "executing upload");
        let response = client
            .transport()
            .upload(request, data, progress, cancel)
            .await?;
        self.map_response(response)
    }
}
