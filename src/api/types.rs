//! Wire types for the generation API
//!
//! All JSON bodies use snake_case field names, matching the server schemas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Bounds applied to the requested question count before a job is started
pub const MIN_QUESTIONS: u32 = 5;
pub const MAX_QUESTIONS: u32 = 200;

/// A user-defined grouping of source files destined for one Anki deck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub file_count: u32,
}

/// An uploaded source document; immutable once created except for deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub original_filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Server-side job status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One asynchronous card-generation run scoped to a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub user_id: i64,
    pub mode: String,
    pub status: JobStatus,
    pub progress: u8,
    pub stage: String,
    #[serde(default)]
    pub params_json: serde_json::Value,
    /// Output-format name -> server-side file reference; only set when done
    #[serde(default)]
    pub result_paths: Option<HashMap<String, String>>,
    /// Only set when failed
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Whether a named artifact is available for download/send
    pub fn has_artifact(&self, format: &str) -> bool {
        self.result_paths
            .as_ref()
            .map(|paths| paths.contains_key(format))
            .unwrap_or(false)
    }
}

/// Generation parameters sent when starting a job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobParams {
    pub mode: String,
    pub number_of_questions: u32,
    pub difficulty: String,
    pub avoid_repeats: bool,
    pub include_answers: bool,
}

impl JobParams {
    /// Build parameters with the question count clamped into [5, 200]
    pub fn new(mode: &str, number_of_questions: u32, difficulty: &str) -> Self {
        Self {
            mode: mode.to_string(),
            number_of_questions: number_of_questions.clamp(MIN_QUESTIONS, MAX_QUESTIONS),
            difficulty: difficulty.to_string(),
            avoid_repeats: true,
            include_answers: true,
        }
    }

    pub fn with_flags(mut self, avoid_repeats: bool, include_answers: bool) -> Self {
        self.avoid_repeats = avoid_repeats;
        self.include_answers = include_answers;
        self
    }
}

/// Request body for the Telegram auth exchange
#[derive(Debug, Clone, Serialize)]
pub struct TelegramAuthRequest {
    pub init_data: String,
}

/// Bearer token issued by the auth exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Request body for creating or renaming a topic
#[derive(Debug, Clone, Serialize)]
pub struct TopicTitle {
    pub title: String,
}
