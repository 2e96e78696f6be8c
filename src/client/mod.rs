mod builder;
pub mod storage;
pub mod surface;

pub use builder::ClientBuilder;
pub use storage::LocalStorage;

use std::sync::Arc;
use std::time::Duration;

use crate::api::{HttpTransport, Transport};
use crate::error::Result;

/// Immutable client configuration. A [`Client`] cannot exist without one, so
/// there is no "configured yet?" state to check at call sites.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, no trailing slash.
    pub server_url: String,
    pub application_id: String,
    pub client_key: Option<String>,
    /// Elevated key required by aggregate/distinct, schema writes and file
    /// deletes. Calls needing it fail with `Unauthorized` when absent.
    pub primary_key: Option<String>,
    /// When set, query/aggregate/distinct commands go out as POST with the
    /// facet payload in the body instead of flattened GET parameters.
    pub use_post_for_query: bool,
    pub timeout: Duration,
}

/// Handle to a Meridian backend. Cheap to clone; all state is shared and
/// immutable after construction.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    storage: Option<Arc<dyn LocalStorage>>,
}

impl Client {
    pub(crate) fn from_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Option<Arc<dyn LocalStorage>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            storage,
        }
    }

    /// Build a client with the default HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.timeout)?);
        Ok(Self::from_parts(config, transport, None))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Best-effort local cache, when one was attached at build time.
    pub fn storage(&self) -> Option<&dyn LocalStorage> {
        self.storage.as_deref()
    }

    /// Headers sent with every request, before per-call options are folded in.
    /// The request id is fresh per call so client and server logs correlate.
    pub(crate) fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            (
                "X-Meridian-Application-Id".to_string(),
                self.config.application_id.clone(),
            ),
            (
                "X-Meridian-Request-Id".to_string(),
                uuid::Uuid::new_v4().to_string(),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        if let Some(client_key) = &self.config.client_key {
            headers.push(("X-Meridian-Client-Key".to_string(), client_key.clone()));
        }
        headers
    }
}
