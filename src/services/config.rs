use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::{Command, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::codec;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct ConfigEnvelope<C> {
    params: C,
}

#[derive(Debug, Deserialize)]
struct UpdateEnvelope {
    #[serde(default)]
    result: bool,
}

/// Parameters to merge into the server-side cloud config.
#[derive(Debug, Clone, Serialize)]
pub struct CloudConfigUpdate(pub Value);

impl Client {
    /// Fetch the cloud config, decoding its `params` into the caller's type.
    pub async fn cloud_config<C: DeserializeOwned>(&self) -> Result<C> {
        let command = Command::new(Method::Get, "/config", |bytes| {
            Ok(codec::decode_body::<ConfigEnvelope<C>>(bytes)?.params)
        });
        command.execute(self, &RequestOptions::new()).await
    }

    /// Merge parameters into the cloud config. Requires the primary key.
    pub async fn update_cloud_config(&self, update: CloudConfigUpdate) -> Result<bool> {
        let command = Command::new(Method::Put, "/config", |bytes| {
            Ok(codec::decode_body::<UpdateEnvelope>(bytes)?.result)
        })
        .body(json!({"params": update.0}))
        .options(RequestOptions::new().with(RequestOption::UsePrimaryKey));
        command.execute(self, &RequestOptions::new()).await
    }
}
