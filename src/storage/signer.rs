//! AWS Signature Version 4 signing for S3-compatible requests.
//!
//! Produces the canonical request, string-to-sign and `Authorization` header
//! for path-style requests against the provider endpoint. The region is the
//! provider's fixed `auto` pseudo-region and the service is always `s3`.
//! There is no shared mutable state: the signing key chain is derived fresh
//! on every call, and the result is fully determined by the inputs plus the
//! timestamp.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::config::ResolvedEnvironment;

type HmacSha256 = Hmac<Sha256>;

/// Hex lookup table for percent encoding
static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// SHA-256 of the empty payload
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const REGION: &str = "auto";
const SERVICE: &str = "s3";

/// A fully signed request, ready for the transport.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Final request URL: endpoint + canonical URI + canonical query.
    pub url: String,
    /// All request headers, `authorization` included. Names are lower-case.
    pub headers: BTreeMap<String, String>,
}

/// Sign a request against the resolved environment at the current time.
///
/// `key` is the object key; `None` addresses the bucket root (listing).
/// Query parameters with empty values are dropped from the canonical form.
pub fn sign_request(
    env: &ResolvedEnvironment,
    method: &str,
    key: Option<&str>,
    query: &[(String, String)],
    extra_headers: &BTreeMap<String, String>,
    body: &[u8],
) -> SignedRequest {
    sign_request_at(env, method, key, query, extra_headers, body, Utc::now())
}

/// Signing with an explicit timestamp. Deterministic for fixed inputs.
pub fn sign_request_at(
    env: &ResolvedEnvironment,
    method: &str,
    key: Option<&str>,
    query: &[(String, String)],
    extra_headers: &BTreeMap<String, String>,
    body: &[u8],
    now: DateTime<Utc>,
) -> SignedRequest {
    let payload_hash = if body.is_empty() {
        EMPTY_SHA256.to_string()
    } else {
        hex::encode(Sha256::digest(body))
    };

    // 20260102T030405Z; the first 8 characters form the date stamp
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = amz_date[..8].to_string();

    let canonical_uri = canonical_uri(&env.bucket, key);
    let canonical_query = canonical_query_string(query);

    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in extra_headers {
        headers.insert(name.to_ascii_lowercase(), collapse_whitespace(value));
    }
    headers.insert("host".to_string(), env.hostname.clone());
    headers.insert("x-amz-date".to_string(), amz_date.clone());
    headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());

    // BTreeMap keeps names sorted, so both canonical forms fall out directly
    let canonical_headers = canonical_headers(&headers);
    let signed_headers = signed_header_names(&headers);

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method, canonical_uri, canonical_query, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, REGION, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let signing_key = derive_signing_key(&env.secret_access_key, &date_stamp);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    headers.insert(
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, env.access_key_id, credential_scope, signed_headers, signature
        ),
    );

    let url = if canonical_query.is_empty() {
        format!("{}{}", env.endpoint, canonical_uri)
    } else {
        format!("{}{}?{}", env.endpoint, canonical_uri, canonical_query)
    };

    SignedRequest { url, headers }
}

/// Canonical URI: `/` + encoded bucket (+ `/` + slash-preserving encoded key).
fn canonical_uri(bucket: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if !key.is_empty() => {
            format!("/{}/{}", uri_encode(bucket, true), uri_encode(key, false))
        }
        _ => format!("/{}", uri_encode(bucket, true)),
    }
}

/// Canonical query string: encoded pairs sorted by encoded key.
fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut params: Vec<(String, String)> = query
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (uri_encode(key, true), uri_encode(value, true)))
        .collect();

    params.sort();

    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical headers block: `name:value\n` lines, names already sorted.
fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(headers.len() * 64);
    for (name, value) in headers {
        result.push_str(name);
        result.push(':');
        result.push_str(value.trim());
        result.push('\n');
    }
    result
}

/// Semicolon-joined sorted header names.
fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

/// Collapse internal runs of whitespace to single spaces.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the signing key from the date stamp (4 chained HMAC operations).
fn derive_signing_key(secret: &str, date_stamp: &str) -> [u8; 32] {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, REGION.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// HMAC-SHA256 returning a fixed-size array
fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(msg);
    let result = mac.finalize().into_bytes();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// URI encode a string (RFC 3986, uppercase hex).
///
/// With `encode_slash = false`, `/` is preserved so a multi-segment key
/// keeps its shape while every segment is still encoded.
pub(crate) fn uri_encode(s: &str, encode_slash: bool) -> String {
    let mut result = String::with_capacity(s.len() + 16);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            b'/' if !encode_slash => {
                result.push('/');
            }
            _ => {
                result.push('%');
                result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, RawSettings};
    use chrono::TimeZone;

    fn test_env() -> ResolvedEnvironment {
        resolve(&RawSettings {
            account_id: Some("acct1".to_string()),
            access_key_id: Some("AKIDEXAMPLE".to_string()),
            secret_access_key: Some("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string()),
            bucket: Some("files".to_string()),
            ..RawSettings::default()
        })
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("hello world", true), "hello%20world");
        assert_eq!(uri_encode("hello/world", true), "hello%2Fworld");
        assert_eq!(uri_encode("hello/world", false), "hello/world");
        assert_eq!(uri_encode("test@example.com", true), "test%40example.com");
    }

    #[test]
    fn test_empty_sha256_constant() {
        let computed = hex::encode(Sha256::digest(b""));
        assert_eq!(EMPTY_SHA256, computed);
    }

    #[test]
    fn test_canonical_query_order_independent() {
        let forward = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        let backward = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ];

        assert_eq!(canonical_query_string(&forward), "a=1&b=2");
        assert_eq!(
            canonical_query_string(&forward),
            canonical_query_string(&backward)
        );
    }

    #[test]
    fn test_canonical_query_drops_empty_values() {
        let query = vec![
            ("prefix".to_string(), String::new()),
            ("list-type".to_string(), "2".to_string()),
        ];
        assert_eq!(canonical_query_string(&query), "list-type=2");
    }

    #[test]
    fn test_canonical_uri_with_and_without_key() {
        assert_eq!(canonical_uri("files", None), "/files");
        assert_eq!(
            canonical_uri("files", Some("uploads/a b.png")),
            "/files/uploads/a%20b.png"
        );
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("text/plain"), "text/plain");
        assert_eq!(collapse_whitespace("a  b\t c"), "a b c");
    }

    #[test]
    fn test_signing_is_deterministic() {
        let env = test_env();
        let extra = BTreeMap::new();

        let first = sign_request_at(&env, "GET", None, &[], &extra, b"", fixed_time());
        let second = sign_request_at(&env, "GET", None, &[], &extra, b"", fixed_time());

        assert_eq!(first.headers, second.headers);
        assert_eq!(first.url, second.url);
    }

    #[test]
    fn test_signed_headers_include_extras_sorted() {
        let env = test_env();
        let mut extra = BTreeMap::new();
        extra.insert("Content-Type".to_string(), "text/plain".to_string());

        let signed = sign_request_at(&env, "PUT", Some("uploads/a.txt"), &[], &extra, b"x", fixed_time());
        let authorization = signed.headers.get("authorization").unwrap();

        assert!(authorization
            .contains("SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date"));
        assert!(authorization.contains("Credential=AKIDEXAMPLE/20260102/auto/s3/aws4_request"));
        assert_eq!(signed.headers.get("content-type").unwrap(), "text/plain");
        assert_eq!(
            signed.headers.get("host").unwrap(),
            "acct1.r2.cloudflarestorage.com"
        );
        assert_eq!(signed.headers.get("x-amz-date").unwrap(), "20260102T030405Z");
    }

    #[test]
    fn test_known_signature() {
        let env = test_env();
        let mut extra = BTreeMap::new();
        extra.insert("Content-Type".to_string(), "text/plain".to_string());

        let signed = sign_request_at(
            &env,
            "PUT",
            Some("uploads/hello world.txt"),
            &[],
            &extra,
            b"hello",
            fixed_time(),
        );

        assert_eq!(
            signed.url,
            "https://acct1.r2.cloudflarestorage.com/files/uploads/hello%20world.txt"
        );
        assert_eq!(
            signed.headers.get("x-amz-content-sha256").unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            signed.headers.get("authorization").unwrap(),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20260102/auto/s3/aws4_request, \
             SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date, \
             Signature=0d9586e5d74b9f4402c824b1eeebba6fcc45506d1c10e60f4f6573ebb46cf66b"
        );
    }

    #[test]
    fn test_empty_body_uses_empty_hash() {
        let env = test_env();
        let signed = sign_request_at(&env, "DELETE", Some("uploads/a.txt"), &[], &BTreeMap::new(), b"", fixed_time());
        assert_eq!(
            signed.headers.get("x-amz-content-sha256").unwrap(),
            EMPTY_SHA256
        );
    }

    #[test]
    fn test_query_appears_in_url_in_canonical_order() {
        let env = test_env();
        let query = vec![
            ("prefix".to_string(), "uploads".to_string()),
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), "50".to_string()),
        ];
        let signed = sign_request_at(&env, "GET", None, &query, &BTreeMap::new(), b"", fixed_time());
        assert_eq!(
            signed.url,
            "https://acct1.r2.cloudflarestorage.com/files?list-type=2&max-keys=50&prefix=uploads"
        );
    }
}
