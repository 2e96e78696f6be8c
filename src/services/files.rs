use serde::{Deserialize, Serialize};

use crate::api::{
    CancellationToken, Command, Method, ProgressFn, RequestOption, RequestOptions,
};
use crate::client::Client;
use crate::codec;
use crate::error::{Error, Result};

/// A stored file reference. Encodes as the `{"__type":"File"}` envelope; the
/// URL is assigned by the server on upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "File")]
pub struct File {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

impl File {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    name: String,
    url: String,
}

impl Client {
    /// Upload raw bytes as a named file. Progress is reported with
    /// monotonically non-decreasing byte counts; cancelling mid-transfer
    /// fails the upload without invalidating progress already delivered.
    pub async fn upload_file(
        &self,
        file: &File,
        data: Vec<u8>,
        mime_type: Option<&str>,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<File> {
        let mut options = RequestOptions::new();
        if let Some(mime) = mime_type {
            options.insert(RequestOption::MimeType(mime.to_string()));
        }
        let command = Command::new(Method::Post, format!("/files/{}", file.name), |bytes| {
            let echo = codec::decode_body::<UploadEnvelope>(bytes)?;
            Ok(File {
                name: echo.name,
                url: Some(echo.url),
            })
        })
        .options(options);
        command
            .execute_upload(self, &RequestOptions::new(), data, progress, cancel)
            .await
    }

    /// Download a file's contents from its server-assigned URL.
    pub async fn download_file(
        &self,
        file: &File,
        progress: Option<ProgressFn>,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>> {
        let url = file
            .url
            .as_deref()
            .ok_or_else(|| Error::OtherCause("file has no URL; upload it first".to_string()))?;
        let command = Command::new(Method::Get, url, |bytes: &[u8]| Ok(bytes.to_vec())).absolute();
        command
            .execute_download(self, &RequestOptions::new(), progress, cancel)
            .await
    }

    /// Delete a stored file. Requires the primary key.
    pub async fn delete_file(&self, file: &File) -> Result<()> {
        let command = Command::new(Method::Delete, format!("/files/{}", file.name), |_| Ok(()))
            .options(RequestOptions::new().with(RequestOption::UsePrimaryKey));
        command.execute(self, &RequestOptions::new()).await
    }
}
