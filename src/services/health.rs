use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::api::{Command, Method, RequestOptions};
use crate::client::Client;
use crate::codec;
use crate::error::Result;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(200);

/// Server health as reported by `GET /health`. `Starting` and `Initialized`
/// are non-terminal; `Ok` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerHealth {
    Ok,
    Initialized,
    Starting,
    Error,
}

impl ServerHealth {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerHealth::Ok | ServerHealth::Error)
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: ServerHealth,
}

fn health_command() -> Command<ServerHealth> {
    Command::new(Method::Get, "/health", |bytes| {
        Ok(codec::decode_body::<HealthResponse>(bytes)?.status)
    })
}

impl Client {
    /// Check server health, polling through non-terminal statuses until the
    /// server reports a terminal one (or attempts run out). Exactly one
    /// status is returned; intermediate ones are suppressed.
    pub async fn health(&self) -> Result<ServerHealth> {
        self.health_inner(None).await
    }

    /// Like [`health`](Client::health), but every observed status, including
    /// non-terminal ones, is also pushed into `updates` as it arrives.
    pub async fn health_with_updates(
        &self,
        updates: mpsc::Sender<ServerHealth>,
    ) -> Result<ServerHealth> {
        self.health_inner(Some(updates)).await
    }

    async fn health_inner(
        &self,
        updates: Option<mpsc::Sender<ServerHealth>>,
    ) -> Result<ServerHealth> {
        let command = health_command();
        let mut status = command.execute(self, &RequestOptions::new()).await?;
        let mut attempts = 1;
        loop {
            if let Some(updates) = &updates {
                // Receiver going away just means nobody is listening anymore.
                let _ = updates.send(status).await;
            }
            if status.is_terminal() || attempts >= MAX_ATTEMPTS {
                return Ok(status);
            }
            sleep(RETRY_DELAY).await;
            status = command.execute(self, &RequestOptions::new()).await?;
            attempts += 1;
        }
    }
}
