//! Public facade over the signed storage stack.
//!
//! Each operation independently resolves the environment, sanitizes keys,
//! signs the request and sends it - there is no cached state between calls,
//! so configuration changes in a long-lived process take effect immediately.

use bytes::Bytes;
use reqwest::Method;
use std::collections::BTreeMap;

use crate::config::{self, RawSettings, ResolvedEnvironment};
use crate::error::{Result, StorageError};
use crate::storage::keys;
use crate::storage::signer;
use crate::storage::transport;
use crate::storage::types::{
    DeletedKey, ListRequest, ListResult, StatusSummary, UploadRequest, UploadResult,
};
use crate::storage::xml;

const DEFAULT_LIST_LIMIT: i32 = 50;
const MAX_LIST_LIMIT: i32 = 500;

/// Signed object storage client.
///
/// Holds no connection and no mutable state; clones are independent and
/// every call is reentrant-safe.
#[derive(Debug, Clone, Default)]
pub struct StorageClient {
    settings: Option<RawSettings>,
}

impl StorageClient {
    /// Client that re-reads the process environment on every call.
    pub fn from_env() -> Self {
        Self { settings: None }
    }

    /// Client pinned to explicit settings (tests, embedded configuration).
    pub fn with_settings(settings: RawSettings) -> Self {
        Self {
            settings: Some(settings),
        }
    }

    fn environment(&self) -> ResolvedEnvironment {
        match &self.settings {
            Some(settings) => config::resolve(settings),
            None => config::resolve(&RawSettings::from_env()),
        }
    }

    /// Resolved environment, or `Configuration` when required fields are
    /// absent. Gate for every network entry point.
    fn configured_environment(&self) -> Result<ResolvedEnvironment> {
        let env = self.environment();
        if env.configured() {
            Ok(env)
        } else {
            Err(StorageError::Configuration {
                missing: env.missing,
            })
        }
    }

    /// Configuration state. No I/O, safe to call even when unconfigured.
    pub fn status_summary(&self) -> StatusSummary {
        let env = self.environment();
        StatusSummary {
            configured: env.configured(),
            missing: env.missing,
            bucket: non_empty(env.bucket),
            base_prefix: env.base_prefix,
            endpoint: non_empty(env.endpoint),
            public_base_url: non_empty(env.public_base_url),
        }
    }

    /// Upload a single object under `base_prefix[/folder]/file_name`.
    pub async fn upload_object(&self, request: UploadRequest) -> Result<UploadResult> {
        let env = self.configured_environment()?;

        let file_name = keys::sanitize_file_name(&request.file_name);
        let key = keys::join_key_parts([
            env.base_prefix.as_str(),
            request.folder.as_deref().unwrap_or(""),
            file_name.as_str(),
        ]);

        let mut extra_headers = BTreeMap::new();
        if let Some(content_type) = request
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            extra_headers.insert("content-type".to_string(), content_type.to_string());
        }

        let signed = signer::sign_request(&env, "PUT", Some(&key), &[], &extra_headers, &request.body);
        let response =
            transport::send(&env, Method::PUT, "upload", Some(&key), signed, request.body).await?;

        Ok(UploadResult {
            public_url: object_url(&env, &key),
            key,
            etag: response.etag,
        })
    }

    /// List objects under `base_prefix[/prefix]`, one page at a time.
    pub async fn list_objects(&self, request: ListRequest) -> Result<ListResult> {
        let env = self.configured_environment()?;

        let prefix = keys::join_key_parts([
            env.base_prefix.as_str(),
            request.prefix.as_deref().unwrap_or(""),
        ]);
        let limit = request
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        let mut query: Vec<(String, String)> = vec![
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), limit.to_string()),
            ("prefix".to_string(), prefix),
        ];
        if let Some(token) = request
            .continuation_token
            .as_deref()
            .filter(|t| !t.is_empty())
        {
            query.push(("continuation-token".to_string(), token.to_string()));
        }

        let signed = signer::sign_request(&env, "GET", None, &query, &BTreeMap::new(), b"");
        let response = transport::send(&env, Method::GET, "list", None, signed, Bytes::new()).await?;

        let public_base = if env.public_base_url.is_empty() {
            None
        } else {
            Some(env.public_base_url.as_str())
        };
        xml::parse_list_response(&response.body, public_base)
    }

    /// Delete one object. The key must resolve inside the base prefix.
    pub async fn delete_object(&self, key: &str) -> Result<DeletedKey> {
        let env = self.configured_environment()?;
        let key = keys::ensure_within_prefix(&env, key)?;

        let signed = signer::sign_request(&env, "DELETE", Some(&key), &[], &BTreeMap::new(), b"");
        transport::send(&env, Method::DELETE, "delete", Some(&key), signed, Bytes::new()).await?;

        Ok(DeletedKey { key })
    }

    /// Public URL for a key. Pure derivation; `None` when unconfigured or
    /// the key sanitizes to nothing. Never fails.
    pub fn build_public_url(&self, key: &str) -> Option<String> {
        let env = self.environment();
        if !env.configured() {
            return None;
        }
        let key = keys::sanitize_prefix(key);
        if key.is_empty() {
            return None;
        }
        object_url(&env, &key)
    }
}

fn object_url(env: &ResolvedEnvironment, key: &str) -> Option<String> {
    if env.public_base_url.is_empty() || key.is_empty() {
        return None;
    }
    Some(xml::object_url(&env.public_base_url, key))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_client() -> StorageClient {
        StorageClient::with_settings(RawSettings {
            account_id: Some("acct1".to_string()),
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            bucket: Some("files".to_string()),
            base_prefix: Some("imgs".to_string()),
            ..RawSettings::default()
        })
    }

    #[test]
    fn test_status_summary_configured() {
        let summary = configured_client().status_summary();
        assert!(summary.configured);
        assert!(summary.missing.is_empty());
        assert_eq!(summary.bucket.as_deref(), Some("files"));
        assert_eq!(summary.base_prefix, "imgs");
        assert_eq!(
            summary.endpoint.as_deref(),
            Some("https://acct1.r2.cloudflarestorage.com")
        );
    }

    #[test]
    fn test_status_summary_unconfigured() {
        let client = StorageClient::with_settings(RawSettings::default());
        let summary = client.status_summary();
        assert!(!summary.configured);
        assert_eq!(summary.missing.len(), 4);
        assert!(summary.bucket.is_none());
        assert!(summary.endpoint.is_none());
    }

    #[test]
    fn test_build_public_url() {
        let client = configured_client();
        assert_eq!(
            client.build_public_url("imgs/a b.png").as_deref(),
            Some("https://acct1.r2.cloudflarestorage.com/files/imgs/a%20b.png")
        );
        assert!(client.build_public_url("").is_none());
        assert!(client.build_public_url("../..").is_none());

        let unconfigured = StorageClient::with_settings(RawSettings::default());
        assert!(unconfigured.build_public_url("imgs/a.png").is_none());
    }
}
