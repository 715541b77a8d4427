//! Topics resource client
//!
//! Thin typed wrapper over the HTTP facade: path and payload shaping only.
//! No retries, no caching; every call is a fresh round trip and errors
//! propagate unmodified.

use std::sync::Arc;
use uuid::Uuid;

use super::client::ApiClient;
use super::types::{Topic, TopicTitle};
use crate::errors::ApiResult;

pub struct TopicsClient {
    api: Arc<ApiClient>,
}

impl TopicsClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> ApiResult<Vec<Topic>> {
        self.api.get_json("/topics/", "Failed to load topics").await
    }

    pub async fn create(&self, title: &str) -> ApiResult<Topic> {
        let payload = TopicTitle {
            title: title.to_string(),
        };
        self.api
            .post_json("/topics/", &payload, "Failed to create topic")
            .await
    }

    pub async fn rename(&self, topic_id: Uuid, title: &str) -> ApiResult<Topic> {
        let payload = TopicTitle {
            title: title.to_string(),
        };
        self.api
            .patch_json(
                &format!("/topics/{}", topic_id),
                &payload,
                "Failed to rename topic",
            )
            .await
    }

    /// Deletion cascades to files and jobs server-side
    pub async fn delete(&self, topic_id: Uuid) -> ApiResult<()> {
        self.api
            .delete(&format!("/topics/{}", topic_id), "Failed to delete topic")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::AuthSession;
    use crate::testutil::{MockApi, MockResponse};

    fn topics_for(mock: &MockApi) -> TopicsClient {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(AuthSession::new(
            "ANKIGEN_TEST_UNSET_ENV",
            false,
            dir.into_path().join("session.token"),
        ));
        let config = ApiConfig {
            base_url: mock.base_url(),
            timeout_seconds: 5,
        };
        TopicsClient::new(Arc::new(ApiClient::new(&config, session).unwrap()))
    }

    const TOPIC_JSON: &str = r#"{
        "id": "a1a2a3a4-b1b2-4c12-8d12-0123456789ab",
        "user_id": 7,
        "title": "Biology",
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-02T09:30:00Z",
        "file_count": 3
    }"#;

    #[tokio::test]
    async fn test_list_and_create_paths() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, &format!("[{}]", TOPIC_JSON)),
            MockResponse::json(200, TOPIC_JSON),
        ]);
        let topics = topics_for(&mock);

        let listed = topics.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Biology");
        assert_eq!(listed[0].file_count, 3);

        let created = topics.create("Biology").await.unwrap();
        assert_eq!(created.title, "Biology");

        let requests = mock.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/api/topics/");
        assert_eq!(requests[1].method, "POST");
        assert!(requests[1].body.contains("\"title\":\"Biology\""));
    }

    #[tokio::test]
    async fn test_rename_and_delete_paths() {
        let mock = MockApi::start(vec![
            MockResponse::json(200, TOPIC_JSON),
            MockResponse::json(200, "{\"status\": \"deleted\"}"),
        ]);
        let topics = topics_for(&mock);
        let id: Uuid = "a1a2a3a4-b1b2-4c12-8d12-0123456789ab".parse().unwrap();

        topics.rename(id, "Botany").await.unwrap();
        topics.delete(id).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(
            requests[0].path,
            "/api/topics/a1a2a3a4-b1b2-4c12-8d12-0123456789ab"
        );
        assert_eq!(requests[1].method, "DELETE");
    }
}
