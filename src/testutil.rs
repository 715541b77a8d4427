//! Shared test support: a scripted local mock of the generation API
//!
//! Serves canned responses in order on a real socket so the facade, the
//! resource clients and the job tracker are exercised through the full
//! reqwest stack. Once the script runs out, the last response repeats,
//! which is what polling tests want.

use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};

use tiny_http::{Header, Response, Server};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("text/plain"),
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: String::new(),
        }
    }
}

pub struct MockApi {
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    base: String,
}

impl MockApi {
    pub fn start(responses: Vec<MockResponse>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("mock server bind"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("mock server ip address");
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let worker_server = server.clone();
        let worker_requests = requests.clone();
        std::thread::spawn(move || {
            let mut script: VecDeque<MockResponse> = responses.into();
            let mut last: Option<MockResponse> = None;

            for mut request in worker_server.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);

                let bearer = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| {
                        h.value
                            .as_str()
                            .trim_start_matches("Bearer ")
                            .to_string()
                    });

                if let Ok(mut log) = worker_requests.lock() {
                    log.push(RecordedRequest {
                        method: request.method().to_string(),
                        path: request.url().to_string(),
                        bearer,
                        body,
                    });
                }

                let reply = match script.pop_front() {
                    Some(reply) => {
                        last = Some(reply.clone());
                        reply
                    }
                    None => last
                        .clone()
                        .unwrap_or_else(|| MockResponse::text(500, "mock script exhausted")),
                };

                let mut response =
                    Response::from_string(reply.body.clone()).with_status_code(reply.status);
                if let Some(content_type) = reply.content_type {
                    if let Ok(header) =
                        Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                    {
                        response = response.with_header(header);
                    }
                }
                let _ = request.respond(response);
            }
        });

        Self {
            server,
            requests,
            base: format!("http://{}/api", addr),
        }
    }

    /// Base URL to hand to `ApiConfig` (includes the /api prefix)
    pub fn base_url(&self) -> String {
        self.base.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Canonical job payload used across client and tracker tests
pub fn job_json(status: &str, stage: &str, progress: u8) -> String {
    job_json_with(status, stage, progress, None, &[])
}

/// Job payload with an error message and/or result paths
pub fn job_json_with(
    status: &str,
    stage: &str,
    progress: u8,
    error_message: Option<&str>,
    result_paths: &[(&str, &str)],
) -> String {
    let results = if result_paths.is_empty() {
        "null".to_string()
    } else {
        let entries: Vec<String> = result_paths
            .iter()
            .map(|(format, path)| format!("\"{}\": \"{}\"", format, path))
            .collect();
        format!("{{{}}}", entries.join(", "))
    };
    let error = match error_message {
        Some(message) => format!("\"{}\"", message),
        None => "null".to_string(),
    };

    format!(
        r#"{{
            "id": "b6b3ab11-59ee-4d12-9f5c-0123456789ab",
            "topic_id": "a1a2a3a4-b1b2-4c12-8d12-0123456789ab",
            "user_id": 7,
            "mode": "merged",
            "status": "{}",
            "progress": {},
            "stage": "{}",
            "params_json": {{"mode": "merged", "number_of_questions": 20, "difficulty": "medium"}},
            "result_paths": {},
            "error_message": {},
            "created_at": "2024-05-01T10:00:00Z",
            "finished_at": null
        }}"#,
        status, progress, stage, results, error
    )
}
