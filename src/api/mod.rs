//! HTTP API layer: the client facade plus typed resource clients
//!
//! `client` is the sole place transport failures are normalized; the
//! resource clients (`topics`, `files`, `jobs`) are path/payload shaping
//! over it, and `types` holds the wire schemas.

pub mod client;
pub mod files;
pub mod jobs;
pub mod topics;
pub mod types;

pub use client::ApiClient;
pub use files::FilesClient;
pub use jobs::JobsClient;
pub use topics::TopicsClient;
