//! Result types returned by the storage facade.

use bytes::Bytes;
use serde::Serialize;

/// Metadata for one stored object, parsed from a list response.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectSummary {
    /// Full object key (base prefix included)
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp, RFC 3339, when the provider sent a valid one
    pub last_modified: Option<String>,
    /// ETag with surrounding quotes stripped
    pub etag: Option<String>,
    /// Public URL, when a public base is configured
    pub public_url: Option<String>,
}

/// One page of a listing, in provider order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListResult {
    pub objects: Vec<ObjectSummary>,
    /// Whether more results exist beyond this page
    pub has_more: bool,
    /// Opaque token for the next page; `None` when exhausted
    pub continuation_token: Option<String>,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub key: String,
    pub etag: Option<String>,
    pub public_url: Option<String>,
}

/// Result of a successful delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedKey {
    pub key: String,
}

/// Configuration state, safe to query without any I/O.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub configured: bool,
    /// Names of absent required fields
    pub missing: Vec<String>,
    pub bucket: Option<String>,
    pub base_prefix: String,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
}

/// Parameters for `upload_object`.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Caller-provided file name; only its final path segment is kept
    pub file_name: String,
    /// Optional folder under the base prefix
    pub folder: Option<String>,
    /// Optional Content-Type header value
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Parameters for `list_objects`.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    /// Optional prefix under the base prefix
    pub prefix: Option<String>,
    /// Page size, clamped to `[1, 500]`; defaults to 50
    pub limit: Option<i32>,
    /// Token from a previous page
    pub continuation_token: Option<String>,
}
