use std::sync::Arc;
use std::time::Duration;

use super::{Client, ClientConfig, LocalStorage};
use crate::api::Transport;
use crate::error::Result;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`Client`]. The server URL and application id are mandatory;
/// everything else has a sensible default.
pub struct ClientBuilder {
    server_url: String,
    application_id: String,
    client_key: Option<String>,
    primary_key: Option<String>,
    use_post_for_query: bool,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    storage: Option<Arc<dyn LocalStorage>>,
}

impl ClientBuilder {
    pub fn new(server_url: &str, application_id: &str) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            application_id: application_id.to_string(),
            client_key: None,
            primary_key: None,
            use_post_for_query: false,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            storage: None,
        }
    }

    pub fn client_key(mut self, key: &str) -> Self {
        self.client_key = Some(key.to_string());
        self
    }

    pub fn primary_key(mut self, key: &str) -> Self {
        self.primary_key = Some(key.to_string());
        self
    }

    /// Send queries as POST instead of GET. Useful when constraint trees get
    /// too large for a query string.
    pub fn use_post_for_query(mut self, enabled: bool) -> Self {
        self.use_post_for_query = enabled;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the HTTP transport. Tests use this to inject mocks.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach a best-effort local key-value cache.
    pub fn storage(mut self, storage: Arc<dyn LocalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> Result<Client> {
        let config = ClientConfig {
            server_url: self.server_url,
            application_id: self.application_id,
            client_key: self.client_key,
            primary_key: self.primary_key,
            use_post_for_query: self.use_post_for_query,
            timeout: self.timeout,
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(crate::api::HttpTransport::new(config.timeout)?),
        };
        Ok(Client::from_parts(config, transport, self.storage))
    }
}
