//! Parsers for the provider's XML wire format.
//!
//! Two documents are consumed: `ListBucketResult` on successful listings and
//! `<Error>` bodies on failures. The list parser fails when the root element
//! is absent; individual optional fields default instead. The error parser is
//! best-effort and never fails - an unparsable body simply yields `None`.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, StorageError};
use crate::storage::signer::uri_encode;
use crate::storage::types::{ListResult, ObjectSummary};

/// Provider error body: `<Error><Code>..</Code><Message>..</Message></Error>`
#[derive(Debug, Clone, Default)]
pub(crate) struct ProviderErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Parse a `ListBucketResult` document.
///
/// `public_base` derives each entry's public URL; `None` leaves it unset.
pub(crate) fn parse_list_response(
    xml_data: &[u8],
    public_base: Option<&str>,
) -> Result<ListResult> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut saw_root = false;
    let mut result = ListResult::default();
    let mut current_object: Option<ObjectSummary> = None;
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"ListBucketResult" => saw_root = true,
                b"Contents" => {
                    current_object = Some(ObjectSummary {
                        key: String::new(),
                        size: 0,
                        last_modified: None,
                        etag: None,
                        public_url: None,
                    });
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                current_text.clear();
                match e.unescape() {
                    Ok(text) => current_text.push_str(&text),
                    Err(err) => return Err(parse_failure(xml_data, &err.to_string())),
                }
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Key" => {
                        if let Some(ref mut obj) = current_object {
                            obj.key = std::mem::take(&mut current_text);
                        }
                    }
                    b"Size" => {
                        if let Some(ref mut obj) = current_object {
                            obj.size = current_text.parse().unwrap_or(0);
                        }
                    }
                    b"LastModified" => {
                        if let Some(ref mut obj) = current_object {
                            obj.last_modified = normalize_timestamp(&current_text);
                        }
                    }
                    b"ETag" => {
                        if let Some(ref mut obj) = current_object {
                            obj.etag = Some(current_text.trim_matches('"').to_string());
                        }
                    }
                    b"Contents" => {
                        if let Some(mut obj) = current_object.take() {
                            obj.public_url = public_base.map(|base| object_url(base, &obj.key));
                            result.objects.push(obj);
                        }
                    }
                    b"IsTruncated" => {
                        result.has_more = current_text == "true";
                    }
                    b"NextContinuationToken" => {
                        result.continuation_token = Some(std::mem::take(&mut current_text));
                    }
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_failure(xml_data, &e.to_string())),
            _ => {}
        }
    }

    if !saw_root {
        return Err(parse_failure(xml_data, "missing ListBucketResult root"));
    }

    Ok(result)
}

/// Best-effort parse of a provider `<Error>` body. Never fails.
pub(crate) fn parse_error_response(xml_data: &[u8]) -> Option<ProviderErrorBody> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut saw_root = false;
    let mut body = ProviderErrorBody::default();
    let mut current_text = String::with_capacity(128);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Error" {
                    saw_root = true;
                }
            }
            Ok(Event::Text(e)) => {
                current_text.clear();
                if let Ok(text) = e.unescape() {
                    current_text.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Code" => body.code = Some(std::mem::take(&mut current_text)),
                    b"Message" => body.message = Some(std::mem::take(&mut current_text)),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            // Malformed body: give up, the caller falls back to the raw text
            Err(_) => break,
            _ => {}
        }
    }

    if saw_root && (body.code.is_some() || body.message.is_some()) {
        Some(body)
    } else {
        None
    }
}

/// Public object URL: base + `/` + slash-preserving percent-encoded key.
pub(crate) fn object_url(public_base: &str, key: &str) -> String {
    format!("{}/{}", public_base, uri_encode(key, false))
}

/// Normalize a provider timestamp to RFC 3339, dropping invalid values.
fn normalize_timestamp(raw: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.to_rfc3339())
}

fn parse_failure(xml_data: &[u8], detail: &str) -> StorageError {
    StorageError::Request {
        status: None,
        code: None,
        message: format!(
            "unparsable list response ({}): {}",
            detail,
            String::from_utf8_lossy(xml_data)
        ),
    }
}
