//! Error types for ankigen
//!
//! Two layers: `ApiError` is produced by the auth session and the HTTP
//! facade and propagates unmodified through the resource clients;
//! `JobActionError` is what the job tracker surfaces to the presentation
//! layer, one variant per user-facing action, always non-fatal.

use thiserror::Error;

/// Errors from the auth session and the HTTP facade
#[derive(Error, Debug)]
pub enum ApiError {
    /// Telegram WebApp init data is not available and no stored token exists
    #[error("no Telegram init data available and no stored token to fall back on")]
    AuthContextMissing,

    /// The /auth/telegram exchange was rejected
    #[error("authentication exchange failed: {0}")]
    AuthExchangeFailed(String),

    /// Non-success HTTP status, or a transport failure before any status
    #[error("{}", format_request_failed(.status, .detail))]
    RequestFailed { status: Option<u16>, detail: String },

    /// Response body could not be decoded into the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Local configuration problem (bad base URL, unwritable data dir)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_request_failed(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("request failed (HTTP {}): {}", code, detail),
        None => format!("request failed: {}", detail),
    }
}

impl ApiError {
    /// Transport-level and 5xx failures are worth retrying by the caller
    pub fn is_recoverable(&self) -> bool {
        match self {
            ApiError::RequestFailed { status: None, .. } => true,
            ApiError::RequestFailed {
                status: Some(code), ..
            } => *code >= 500,
            _ => false,
        }
    }

    /// The server rejected our credentials
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            ApiError::RequestFailed {
                status: Some(401) | Some(403),
                ..
            }
        )
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the job tracker, one per user-facing action
///
/// Each wraps the underlying failure detail. None of these corrupt the
/// locally held job snapshot; the tracker remains usable after any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobActionError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("start failed: {0}")]
    Start(String),

    #[error("cancel failed: {0}")]
    Cancel(String),

    #[error("retry failed: {0}")]
    Retry(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("download failed: {0}")]
    Download(String),
}

impl JobActionError {
    /// Short action name for banners and logs
    pub fn action(&self) -> &'static str {
        match self {
            JobActionError::Fetch(_) => "fetch",
            JobActionError::Start(_) => "start",
            JobActionError::Cancel(_) => "cancel",
            JobActionError::Retry(_) => "retry",
            JobActionError::Send(_) => "send",
            JobActionError::Download(_) => "download",
        }
    }

    /// The wrapped failure detail
    pub fn detail(&self) -> &str {
        match self {
            JobActionError::Fetch(d)
            | JobActionError::Start(d)
            | JobActionError::Cancel(d)
            | JobActionError::Retry(d)
            | JobActionError::Send(d)
            | JobActionError::Download(d) => d,
        }
    }
}

pub type JobActionResult<T> = Result<T, JobActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_display() {
        let with_status = ApiError::RequestFailed {
            status: Some(404),
            detail: "Topic not found".to_string(),
        };
        assert_eq!(
            with_status.to_string(),
            "request failed (HTTP 404): Topic not found"
        );

        let no_status = ApiError::RequestFailed {
            status: None,
            detail: "connection refused".to_string(),
        };
        assert_eq!(no_status.to_string(), "request failed: connection refused");
    }

    #[test]
    fn test_recoverability() {
        let transport = ApiError::RequestFailed {
            status: None,
            detail: "timeout".to_string(),
        };
        assert!(transport.is_recoverable());

        let server = ApiError::RequestFailed {
            status: Some(502),
            detail: "bad gateway".to_string(),
        };
        assert!(server.is_recoverable());

        let client = ApiError::RequestFailed {
            status: Some(400),
            detail: "bad request".to_string(),
        };
        assert!(!client.is_recoverable());
        assert!(!ApiError::AuthContextMissing.is_recoverable());
    }

    #[test]
    fn test_action_names() {
        assert_eq!(JobActionError::Cancel("x".into()).action(), "cancel");
        assert_eq!(JobActionError::Download("x".into()).detail(), "x");
    }
}
