//! Document upload.
//!
//! Uploading blocks until the service reports the file processed: a file
//! that is still processing cannot be attached to a knowledge base, so the
//! poll loop lives here rather than with the caller.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use sitesage_shared::{Result, SitesageError};

use crate::KbClient;
use crate::types::FileHandle;

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    filename: &'a str,
    content: &'a str,
    purpose: &'a str,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    id: String,
    status: FileStatus,
    #[serde(default)]
    status_detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FileStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl KbClient {
    /// Upload a corpus document and wait until the service has processed it.
    #[instrument(skip(self, content), fields(filename = %filename, bytes = content.len()))]
    pub async fn upload_document(&self, filename: &str, content: &str) -> Result<FileHandle> {
        let request = UploadRequest {
            filename,
            content,
            purpose: "knowledge_base",
        };

        let response = self
            .request(Method::POST, "/v1/files")
            .json(&request)
            .send()
            .await
            .map_err(|e| SitesageError::Upload(format!("upload request failed: {e}")))?;
        let response = Self::check_upload(response).await?;
        let mut file: FileResponse = response
            .json()
            .await
            .map_err(|e| SitesageError::Upload(format!("invalid upload response: {e}")))?;

        let deadline = std::time::Instant::now() + self.upload_timeout;
        loop {
            match file.status {
                FileStatus::Processed => {
                    debug!(file_id = %file.id, "upload processed");
                    return Ok(FileHandle { id: file.id });
                }
                FileStatus::Failed => {
                    let detail = file
                        .status_detail
                        .unwrap_or_else(|| "processing failed".into());
                    return Err(SitesageError::Upload(format!("file {}: {detail}", file.id)));
                }
                FileStatus::Uploaded | FileStatus::Processing => {
                    if std::time::Instant::now() >= deadline {
                        return Err(SitesageError::Upload(format!(
                            "file {}: not processed after {:?}",
                            file.id, self.upload_timeout
                        )));
                    }
                    tokio::time::sleep(self.upload_poll_interval).await;
                    file = self.get_file(&file.id).await?;
                }
            }
        }
    }

    /// Fetch the current state of an uploaded file.
    async fn get_file(&self, id: &str) -> Result<FileResponse> {
        let response = self
            .request(Method::GET, &format!("/v1/files/{id}"))
            .send()
            .await
            .map_err(|e| SitesageError::Upload(format!("file poll failed: {e}")))?;
        let response = Self::check_upload(response).await?;

        response
            .json()
            .await
            .map_err(|e| SitesageError::Upload(format!("invalid file response: {e}")))
    }

    /// Like [`KbClient::check`], but failures surface as upload errors.
    async fn check_upload(response: reqwest::Response) -> Result<reqwest::Response> {
        Self::check(response, "file upload").await.map_err(|e| match e {
            SitesageError::Service(msg) => SitesageError::Upload(msg),
            other => other,
        })
    }
}
