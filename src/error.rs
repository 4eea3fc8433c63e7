//! Error types for the storage client.
//!
//! Three disjoint kinds: configuration problems (fixable by the operator,
//! raised before any request), provider/transport failures, and caller-side
//! key validation mistakes.

use thiserror::Error;

/// Storage client errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Required configuration is absent. No network call was attempted.
    #[error("storage is not configured, missing: {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    /// The provider rejected the request, or the transport failed.
    ///
    /// `status` is absent for connection-level failures (DNS, TCP, TLS).
    /// `code` is the provider error code when the response body carried one.
    #[error("storage request failed ({}): {message}", .status.map(|s| s.to_string()).unwrap_or_else(|| "no status".to_string()))]
    Request {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// A caller-supplied key failed validation before any request was made.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
