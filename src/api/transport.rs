use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::Method;
use crate::error::{Error, Result};

/// Progress callback for streaming transfers: `(bytes_so_far, total_if_known)`.
/// Invocations are monotonically non-decreasing in the first argument.
pub type ProgressFn = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Cancellation handle for streaming transfers. Cancelling mid-transfer makes
/// the transfer fail; progress already reported stands.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A fully-resolved request handed to the transport. The core builds these;
/// the transport owns everything below (TLS, pooling, retries).
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam. The concrete implementation is [`HttpTransport`]; tests
/// inject mocks. Implementations must be safe to call concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Download with streamed progress. The default transport reads the body
    /// chunk by chunk so large files never buffer twice.
    async fn download(
        &self,
        request: TransportRequest,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<TransportResponse>;

    /// Upload raw bytes (file payloads bypass the JSON body).
    async fn upload(
        &self,
        request: TransportRequest,
        data: Vec<u8>,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<TransportResponse>;
}

/// Production transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| Error::Connection(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn build_request(&self, request: &TransportRequest) -> Result<reqwest::RequestBuilder> {
        let method: reqwest::Method = request
            .method
            .as_str()
            .parse()
            .map_err(|e| Error::Connection(format!("invalid method: {}", e)))?;

        let mut builder = self.client.request(method, &request.url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        builder
            .send()
            .await
            .map_err(|e| Error::Connection(format!("HTTP request failed: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let response = self.send(self.build_request(&request)?).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(format!("failed to read response: {}", e)))?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn download(
        &self,
        request: TransportRequest,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<TransportResponse> {
        let mut response = self.send(self.build_request(&request)?).await?;
        let status = response.status().as_u16();
        let total = response.content_length();

        let mut body = Vec::new();
        loop {
            if cancel.is_cancelled() {
                return Err(Error::OtherCause("transfer cancelled".to_string()));
            }
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    if let Some(progress) = &progress {
                        progress(body.len() as u64, total);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::Connection(format!("download failed: {}", e)));
                }
            }
        }
        Ok(TransportResponse { status, body })
    }

    async fn upload(
        &self,
        request: TransportRequest,
        data: Vec<u8>,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<TransportResponse> {
        if cancel.is_cancelled() {
            return Err(Error::OtherCause("transfer cancelled".to_string()));
        }
        let total = data.len() as u64;
        let builder = self.build_request(&request)?.body(data);
        let response = self.send(builder).await?;
        if let Some(progress) = &progress {
            progress(total, Some(total));
        }
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Connection(format!("failed to read response: {}", e)))?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}
