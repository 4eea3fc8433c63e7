//! asset-store - signed S3-compatible object storage client
//!
//! Talks directly to an S3-compatible endpoint over HTTPS with AWS
//! Signature Version 4 request signing; no SDK involved. All object keys
//! are confined to a configured base prefix, so callers can never address
//! anything outside the storage subtree they were given.

pub mod config;
pub mod error;
pub mod storage;

pub use config::{RawSettings, ResolvedEnvironment};
pub use error::{Result, StorageError};
pub use storage::types::{
    DeletedKey, ListRequest, ListResult, ObjectSummary, StatusSummary, UploadRequest, UploadResult,
};
pub use storage::StorageClient;
