//! Files resource client
//!
//! Upload is one multipart HTTP call per file, never batched: a failure in
//! the middle of a multi-file upload leaves earlier files on the server, so
//! callers re-list afterwards to see actual state.

use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::client::ApiClient;
use super::types::FileRecord;
use crate::errors::{ApiError, ApiResult};

pub struct FilesClient {
    api: Arc<ApiClient>,
}

impl FilesClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self, topic_id: Uuid) -> ApiResult<Vec<FileRecord>> {
        self.api
            .get_json(
                &format!("/topics/{}/files/", topic_id),
                "Failed to load files",
            )
            .await
    }

    /// Upload a single local file as a multipart form
    pub async fn upload(&self, topic_id: Uuid, path: &Path) -> ApiResult<FileRecord> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::Config(format!("invalid file path: {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        self.api
            .post_multipart(
                &format!("/topics/{}/files/", topic_id),
                form,
                "Failed to upload file",
            )
            .await
    }

    pub async fn delete(&self, topic_id: Uuid, file_id: Uuid) -> ApiResult<()> {
        self.api
            .delete(
                &format!("/topics/{}/files/{}", topic_id, file_id),
                "Failed to delete file",
            )
            .await
    }
}
