use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{Command, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::codec::{self, QueryResponse};
use crate::error::Result;

/// One class's schema as the server reports it. Field and index definitions
/// stay dynamic; their shapes vary by server version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub indexes: Map<String, Value>,
    #[serde(
        rename = "classLevelPermissions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub class_level_permissions: Option<Value>,
}

impl Schema {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            fields: Map::new(),
            indexes: Map::new(),
            class_level_permissions: None,
        }
    }
}

fn primary_key_options() -> RequestOptions {
    RequestOptions::new().with(RequestOption::UsePrimaryKey)
}

// All schema operations require the primary key.
impl Client {
    pub async fn schema(&self, class_name: &str) -> Result<Schema> {
        let command = Command::new(
            Method::Get,
            format!("/schemas/{}", class_name),
            codec::decode_body::<Schema>,
        )
        .options(primary_key_options());
        command.execute(self, &RequestOptions::new()).await
    }

    pub async fn all_schemas(&self) -> Result<Vec<Schema>> {
        let command = Command::new(Method::Get, "/schemas", |bytes| {
            Ok(codec::decode_body::<QueryResponse<Schema>>(bytes)?.results)
        })
        .options(primary_key_options());
        command.execute(self, &RequestOptions::new()).await
    }

    pub async fn create_schema(&self, schema: &Schema) -> Result<Schema> {
        let command = Command::new(
            Method::Post,
            format!("/schemas/{}", schema.class_name),
            codec::decode_body::<Schema>,
        )
        .body(crate::codec::to_wire(schema)?)
        .options(primary_key_options());
        command.execute(self, &RequestOptions::new()).await
    }

    pub async fn update_schema(&self, schema: &Schema) -> Result<Schema> {
        let command = Command::new(
            Method::Put,
            format!("/schemas/{}", schema.class_name),
            codec::decode_body::<Schema>,
        )
        .body(crate::codec::to_wire(schema)?)
        .options(primary_key_options());
        command.execute(self, &RequestOptions::new()).await
    }

    pub async fn delete_schema(&self, class_name: &str) -> Result<()> {
        let command = Command::new(Method::Delete, format!("/schemas/{}", class_name), |_| Ok(()))
            .options(primary_key_options());
        command.execute(self, &RequestOptions::new()).await
    }
}
