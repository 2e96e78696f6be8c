use serde::Deserialize;
use serde_json::Value;

use crate::api::{Command, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::codec;
use crate::error::Result;

/// Version and feature map reported by `GET /serverInfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    #[serde(rename = "meridianServerVersion")]
    pub version: String,
    #[serde(default)]
    pub features: Value,
}

impl Client {
    /// Fetch server version and feature flags. Requires the primary key.
    pub async fn server_info(&self) -> Result<ServerInfo> {
        let command = Command::new(Method::Get, "/serverInfo", |bytes| {
            codec::decode_body::<ServerInfo>(bytes)
        })
        .options(RequestOptions::new().with(RequestOption::UsePrimaryKey));
        command.execute(self, &RequestOptions::new()).await
    }
}
