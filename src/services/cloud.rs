use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{Command, Method, RequestOptions};
use crate::client::Client;
use crate::codec;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct FunctionEnvelope<V> {
    result: V,
}

impl Client {
    /// Call a cloud function with the given parameters and decode its
    /// `{result: …}` envelope.
    pub async fn run_function<P: Serialize, V: DeserializeOwned>(
        &self,
        name: &str,
        params: &P,
    ) -> Result<V> {
        let command = Command::new(Method::Post, format!("/functions/{}", name), |bytes| {
            Ok(codec::decode_body::<FunctionEnvelope<V>>(bytes)?.result)
        })
        .body(codec::to_wire(params)?);
        command.execute(self, &RequestOptions::new()).await
    }

    /// Start a background job; the result is the job's status handle.
    pub async fn run_job<P: Serialize, V: DeserializeOwned>(
        &self,
        name: &str,
        params: &P,
    ) -> Result<V> {
        let command = Command::new(Method::Post, format!("/jobs/{}", name), |bytes| {
            Ok(codec::decode_body::<FunctionEnvelope<V>>(bytes)?.result)
        })
        .body(codec::to_wire(params)?);
        command.execute(self, &RequestOptions::new()).await
    }
}
