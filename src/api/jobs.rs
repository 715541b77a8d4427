//! Jobs resource client
//!
//! Request shaping for the generation-job endpoints. The polling logic lives
//! in the tracker; this client only issues single round trips.

use std::sync::Arc;
use uuid::Uuid;

use super::client::ApiClient;
use super::types::{Job, JobParams};
use crate::errors::ApiResult;

#[derive(Clone)]
pub struct JobsClient {
    api: Arc<ApiClient>,
}

impl JobsClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Start a generation job; the server assigns the id and initial status
    pub async fn start(&self, topic_id: Uuid, params: &JobParams) -> ApiResult<Job> {
        self.api
            .post_json(
                &format!("/topics/{}/jobs/", topic_id),
                params,
                "Failed to start generation",
            )
            .await
    }

    /// Most recent job for the topic, or None when the server answers null
    pub async fn latest(&self, topic_id: Uuid) -> ApiResult<Option<Job>> {
        self.api
            .get_json(
                &format!("/topics/{}/jobs/latest", topic_id),
                "Failed to load job status",
            )
            .await
    }

    pub async fn get(&self, topic_id: Uuid, job_id: Uuid) -> ApiResult<Job> {
        self.api
            .get_json(
                &format!("/topics/{}/jobs/{}", topic_id, job_id),
                "Failed to load job",
            )
            .await
    }

    /// Cancel; the server answers with the authoritative job record
    pub async fn cancel(&self, topic_id: Uuid, job_id: Uuid) -> ApiResult<Job> {
        self.api
            .post_empty(
                &format!("/topics/{}/jobs/{}/cancel", topic_id, job_id),
                "Failed to cancel job",
            )
            .await
    }

    /// Retry; the server may answer with a brand new job record
    pub async fn retry(&self, topic_id: Uuid, job_id: Uuid) -> ApiResult<Job> {
        self.api
            .post_empty(
                &format!("/topics/{}/jobs/{}/retry", topic_id, job_id),
                "Failed to retry job",
            )
            .await
    }

    /// Push the apkg artifact to the originating Telegram chat
    pub async fn send(&self, topic_id: Uuid, job_id: Uuid) -> ApiResult<()> {
        let _: serde_json::Value = self
            .api
            .post_empty(
                &format!("/topics/{}/jobs/{}/send", topic_id, job_id),
                "Failed to send deck",
            )
            .await?;
        Ok(())
    }

    /// Download an artifact's bytes for a named output format
    pub async fn download(&self, topic_id: Uuid, job_id: Uuid, format: &str) -> ApiResult<Vec<u8>> {
        self.api
            .get_bytes(
                &format!("/topics/{}/jobs/{}/download/{}", topic_id, job_id, format),
                "Failed to download artifact",
            )
            .await
    }
}
