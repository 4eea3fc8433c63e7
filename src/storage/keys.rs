//! Object key sanitization and prefix confinement.
//!
//! Every key that reaches the wire is built from sanitized segments: trimmed,
//! stripped of control characters, with `.`/`..`/empty segments discarded.
//! `ensure_within_prefix` is the security boundary - a caller-supplied key
//! can never address anything outside the configured base prefix, no matter
//! how many `../` segments, null bytes or stray slashes it carries.

use chrono::Utc;

use crate::config::ResolvedEnvironment;
use crate::error::{Result, StorageError};

/// Sanitize a single key segment.
///
/// Returns `None` when the segment collapses to nothing, `.` or `..`.
pub fn sanitize_segment(segment: &str) -> Option<String> {
    let stripped: String = segment.chars().filter(|c| !c.is_control()).collect();
    let trimmed = stripped.trim().trim_matches('/').trim();
    match trimmed {
        "" | "." | ".." => None,
        s => Some(s.to_string()),
    }
}

/// Sanitize a `/`- or `\`-delimited prefix into a clean `/`-joined form.
pub fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .split(['/', '\\'])
        .filter_map(sanitize_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Sanitize every part and join the non-empty results with `/`.
///
/// Parts may themselves contain slashes (e.g. a folder path); each is run
/// through `sanitize_prefix` so traversal segments are dropped everywhere.
pub fn join_key_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|part| sanitize_prefix(part.as_ref()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sanitize an upload file name down to its final path segment.
///
/// Degenerate names (empty, whitespace, `.`/`..`) get a timestamped
/// fallback instead of failing the upload.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit('/').next().unwrap_or("");
    match sanitize_segment(last) {
        Some(segment) => segment,
        None => format!("asset-{}", Utc::now().timestamp_millis()),
    }
}

/// Re-sanitize a caller-supplied key and reject it unless it resolves
/// inside the configured base prefix.
pub fn ensure_within_prefix(env: &ResolvedEnvironment, key: &str) -> Result<String> {
    let sanitized = sanitize_prefix(key);
    if sanitized.is_empty() {
        return Err(StorageError::InvalidKey("empty object key".to_string()));
    }

    let base = &env.base_prefix;
    if base.is_empty()
        || sanitized == *base
        || sanitized.starts_with(&format!("{}/", base))
    {
        Ok(sanitized)
    } else {
        Err(StorageError::InvalidKey(format!(
            "key {:?} is outside the configured prefix {:?}",
            sanitized, base
        )))
    }
}
