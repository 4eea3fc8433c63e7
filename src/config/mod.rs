//! Environment-driven configuration for the storage client.
//!
//! Configuration is read from environment variables with alias fallbacks
//! (first non-empty wins per field) and resolved into a derived environment
//! on every operation. Resolution is pure and never errors: absent required
//! fields surface through `ResolvedEnvironment::missing` and are turned into
//! `StorageError::Configuration` by the facade before any request.

use crate::storage::keys;

/// Host suffix of the provider endpoint: `https://{account}.{suffix}`.
pub const PROVIDER_HOST_SUFFIX: &str = "r2.cloudflarestorage.com";

/// Base key prefix used when none is configured.
pub const DEFAULT_BASE_PREFIX: &str = "uploads";

/// Raw configuration values, prior to resolution.
///
/// `from_env()` reads the process environment; tests and embedding
/// applications can construct this directly instead.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub account_id: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    pub public_base_url: Option<String>,
    pub base_prefix: Option<String>,
    pub proxy_url: Option<String>,
    pub disable_proxy: bool,
}

impl RawSettings {
    /// Read settings from environment variables.
    ///
    /// Each field accepts several aliases, first non-empty wins:
    /// - `R2_ACCOUNT_ID` / `STORAGE_ACCOUNT_ID`
    /// - `R2_ACCESS_KEY_ID` / `STORAGE_ACCESS_KEY_ID` / `AWS_ACCESS_KEY_ID`
    /// - `R2_SECRET_ACCESS_KEY` / `STORAGE_SECRET_ACCESS_KEY` / `AWS_SECRET_ACCESS_KEY`
    /// - `R2_BUCKET` / `STORAGE_BUCKET`
    /// - `R2_PUBLIC_BASE_URL` / `STORAGE_PUBLIC_BASE_URL` (optional)
    /// - `R2_KEY_PREFIX` / `STORAGE_KEY_PREFIX` (optional)
    /// - `STORAGE_PROXY_URL` / `HTTPS_PROXY` / `HTTP_PROXY` (optional)
    /// - `STORAGE_DISABLE_PROXY` (optional flag)
    pub fn from_env() -> Self {
        // Best-effort .env loading; absence is not an error
        let _ = dotenvy::dotenv();

        Self {
            account_id: first_env(&["R2_ACCOUNT_ID", "STORAGE_ACCOUNT_ID"]),
            access_key_id: first_env(&[
                "R2_ACCESS_KEY_ID",
                "STORAGE_ACCESS_KEY_ID",
                "AWS_ACCESS_KEY_ID",
            ]),
            secret_access_key: first_env(&[
                "R2_SECRET_ACCESS_KEY",
                "STORAGE_SECRET_ACCESS_KEY",
                "AWS_SECRET_ACCESS_KEY",
            ]),
            bucket: first_env(&["R2_BUCKET", "STORAGE_BUCKET"]),
            public_base_url: first_env(&["R2_PUBLIC_BASE_URL", "STORAGE_PUBLIC_BASE_URL"]),
            base_prefix: first_env(&["R2_KEY_PREFIX", "STORAGE_KEY_PREFIX"]),
            proxy_url: first_env(&["STORAGE_PROXY_URL", "HTTPS_PROXY", "HTTP_PROXY"]),
            disable_proxy: flag_env("STORAGE_DISABLE_PROXY"),
        }
    }
}

/// First non-empty value among the given environment variables, trimmed.
fn first_env(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

fn flag_env(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Derived configuration, computed fresh on every operation.
#[derive(Debug, Clone)]
pub struct ResolvedEnvironment {
    /// Names of required fields that are absent; empty means configured.
    pub missing: Vec<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    /// Request endpoint (`https://{account}.{suffix}`), empty when the
    /// account id is absent.
    pub endpoint: String,
    /// Bare host portion of the endpoint. Used only for signing.
    pub hostname: String,
    /// Sanitized base key prefix; all object keys live under it.
    pub base_prefix: String,
    /// Public base for object URLs; falls back to `{endpoint}/{bucket}`.
    pub public_base_url: String,
    pub proxy_url: Option<String>,
    pub disable_proxy: bool,
}

impl ResolvedEnvironment {
    pub fn configured(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Resolve raw settings into the derived environment.
pub fn resolve(settings: &RawSettings) -> ResolvedEnvironment {
    let mut missing = Vec::new();

    let account_id = required(&settings.account_id, "account_id", &mut missing);
    let access_key_id = required(&settings.access_key_id, "access_key_id", &mut missing);
    let secret_access_key = required(&settings.secret_access_key, "secret_access_key", &mut missing);
    let bucket = required(&settings.bucket, "bucket", &mut missing);

    let endpoint = if account_id.is_empty() {
        String::new()
    } else {
        format!("https://{}.{}", account_id, PROVIDER_HOST_SUFFIX)
    };
    let hostname = endpoint.strip_prefix("https://").unwrap_or("").to_string();

    let base_prefix = settings
        .base_prefix
        .as_deref()
        .map(keys::sanitize_prefix)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_PREFIX.to_string());

    let public_base_url = match settings
        .public_base_url
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(url) => url.trim_end_matches('/').to_string(),
        None if !endpoint.is_empty() && !bucket.is_empty() => {
            format!("{}/{}", endpoint, bucket)
        }
        None => String::new(),
    };

    ResolvedEnvironment {
        missing,
        access_key_id,
        secret_access_key,
        bucket,
        endpoint,
        hostname,
        base_prefix,
        public_base_url,
        proxy_url: settings
            .proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        disable_proxy: settings.disable_proxy,
    }
}

fn required(value: &Option<String>, name: &'static str, missing: &mut Vec<String>) -> String {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => {
            missing.push(name.to_string());
            String::new()
        }
    }
}
