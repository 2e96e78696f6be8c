use std::collections::HashMap;

use serde_json::json;

use crate::api::{CachePolicy, Command, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::error::Result;

impl Client {
    /// Record a named analytics event with optional string dimensions.
    pub async fn track_event(
        &self,
        name: &str,
        dimensions: &HashMap<String, String>,
    ) -> Result<()> {
        self.track_event_with_options(name, dimensions, &RequestOptions::new())
            .await
    }

    pub async fn track_event_with_options(
        &self,
        name: &str,
        dimensions: &HashMap<String, String>,
        user_options: &RequestOptions,
    ) -> Result<()> {
        // Cache policy is inserted ahead of the caller's options; with
        // first-insert-wins union, a caller-supplied cache policy is ignored
        // here. Same contract as the save call sites.
        let mut options =
            RequestOptions::new().with(RequestOption::CachePolicy(CachePolicy::NoCache));
        options.union(user_options);

        let command = Command::new(Method::Post, format!("/events/{}", name), |_| Ok(()))
            .body(json!({"dimensions": dimensions}))
            .options(options);
        command.execute(self, &RequestOptions::new()).await
    }

    /// Record an app-open event.
    pub async fn track_app_opened(&self, dimensions: &HashMap<String, String>) -> Result<()> {
        self.track_event("AppOpened", dimensions).await
    }
}
