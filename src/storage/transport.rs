//! HTTP transport for signed requests.
//!
//! One request per call, no retries: a failed attempt surfaces immediately
//! and any retry policy belongs to the caller. When a forward proxy is
//! configured the client routes through it; a proxy that cannot be
//! constructed is logged and skipped rather than failing the operation.

use bytes::Bytes;
use reqwest::{Method, Proxy};
use std::time::Duration;
use tracing::warn;

use crate::config::ResolvedEnvironment;
use crate::error::{Result, StorageError};
use crate::storage::signer::SignedRequest;
use crate::storage::xml;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Response from a successful (2xx) exchange.
pub(crate) struct TransportResponse {
    pub etag: Option<String>,
    pub body: Bytes,
}

/// Send a signed request and classify the outcome.
///
/// Non-2xx responses are read fully and parsed as provider error XML;
/// connection-level failures carry no status. Every failure is logged with
/// the operation, method and key before being returned.
pub(crate) async fn send(
    env: &ResolvedEnvironment,
    method: Method,
    operation: &'static str,
    key: Option<&str>,
    signed: SignedRequest,
    body: Bytes,
) -> Result<TransportResponse> {
    let key = key.unwrap_or("-");
    let client = http_client(env)?;

    let mut request = client.request(method.clone(), signed.url.as_str());
    for (name, value) in &signed.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(operation, %method, key, error = %e, "storage request failed to send");
            return Err(StorageError::Request {
                status: None,
                code: None,
                message: e.to_string(),
            });
        }
    };

    let status = response.status();
    let etag = response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim_matches('"').to_string());

    let body_bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(operation, %method, key, error = %e, "failed to read storage response body");
            return Err(StorageError::Request {
                status: Some(status.as_u16()),
                code: None,
                message: e.to_string(),
            });
        }
    };

    if !status.is_success() {
        let (code, message) = match xml::parse_error_response(&body_bytes) {
            Some(parsed) => {
                let message = parsed
                    .message
                    .unwrap_or_else(|| String::from_utf8_lossy(&body_bytes).to_string());
                (parsed.code, message)
            }
            None => (None, String::from_utf8_lossy(&body_bytes).to_string()),
        };
        warn!(
            operation,
            %method,
            key,
            status = status.as_u16(),
            code = code.as_deref().unwrap_or("-"),
            "storage request rejected"
        );
        return Err(StorageError::Request {
            status: Some(status.as_u16()),
            code,
            message,
        });
    }

    Ok(TransportResponse {
        etag,
        body: body_bytes,
    })
}

fn http_client(env: &ResolvedEnvironment) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(REQUEST_TIMEOUT);
    if let Some(proxy) = build_proxy(env) {
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|e| StorageError::Request {
        status: None,
        code: None,
        message: format!("failed to build HTTP client: {}", e),
    })
}

/// Best-effort forward proxy. An unusable proxy URL downgrades to a direct
/// connection instead of failing the operation.
fn build_proxy(env: &ResolvedEnvironment) -> Option<Proxy> {
    if env.disable_proxy {
        return None;
    }
    let url = env.proxy_url.as_deref()?;
    match Proxy::all(url) {
        Ok(proxy) => Some(proxy),
        Err(e) => {
            warn!(proxy = url, error = %e, "ignoring unusable proxy, connecting directly");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, RawSettings};

    fn settings() -> RawSettings {
        RawSettings {
            account_id: Some("acct1".to_string()),
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            bucket: Some("files".to_string()),
            ..RawSettings::default()
        }
    }

    #[test]
    fn test_build_proxy_without_url() {
        let env = resolve(&settings());
        assert!(build_proxy(&env).is_none());
    }

    #[test]
    fn test_build_proxy_disabled() {
        let mut s = settings();
        s.proxy_url = Some("http://proxy.internal:3128".to_string());
        s.disable_proxy = true;
        let env = resolve(&s);
        assert!(build_proxy(&env).is_none());
    }

    #[test]
    fn test_build_proxy_with_valid_url() {
        let mut s = settings();
        s.proxy_url = Some("http://proxy.internal:3128".to_string());
        let env = resolve(&s);
        assert!(build_proxy(&env).is_some());
    }

    #[test]
    fn test_build_proxy_invalid_url_falls_back_to_direct() {
        let mut s = settings();
        s.proxy_url = Some("::not a proxy url::".to_string());
        let env = resolve(&s);
        assert!(build_proxy(&env).is_none());
    }
}
