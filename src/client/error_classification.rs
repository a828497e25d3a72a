//! Error classification logic

use crate::Error;
use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_TYPE};
use serde::Deserialize;
use std::sync::Arc;

/// Trailer (or late header) the daemon uses to report a failure after a 200 response.
pub const STREAM_ERROR_HEADER: &str = "x-stream-error";

/// A non-success response, as seen by an [`ErrorHook`].
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Per-call hook that runs before default classification.
///
/// Returning `Some` replaces the default error; `None` falls through to it.
pub type ErrorHook = Arc<dyn Fn(&ErrorResponse) -> Option<Error> + Send + Sync>;

/// Error payload shape used by the daemon. Both casings occur in the wild.
#[derive(Debug, Deserialize)]
struct DaemonError {
    #[serde(alias = "message")]
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(alias = "code")]
    #[serde(rename = "Code")]
    code: Option<i64>,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// The daemon reports its own context deadline as an ordinary error message.
pub(crate) fn is_deadline_message(message: &str) -> bool {
    message.contains("deadline exceeded") || message.contains("request timed out")
}

/// Classify a non-success response.
pub fn classify(response: &ErrorResponse, hook: Option<&ErrorHook>) -> Error {
    if let Some(hook) = hook {
        if let Some(err) = hook(response) {
            return err;
        }
    }

    let (message, code) = if is_json(&response.headers) {
        match serde_json::from_slice::<DaemonError>(&response.body) {
            Ok(e) => (e.message.unwrap_or_default(), e.code),
            Err(e) => (format!("failed to parse error response: {}", e), None),
        }
    } else {
        (String::from_utf8_lossy(&response.body).trim().to_string(), None)
    };

    if is_deadline_message(&message) {
        return Error::Timeout {
            message: Some(message),
        };
    }

    let message = if message.is_empty() {
        http::StatusCode::from_u16(response.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };

    Error::Http {
        status: response.status,
        message,
        code,
        headers: response.headers.clone(),
    }
}

/// Interpret an `X-Stream-Error` value: a JSON `{Message, Code}` payload or plain text.
pub fn parse_stream_error(raw: &str) -> Error {
    let raw = raw.trim();
    match serde_json::from_str::<DaemonError>(raw) {
        Ok(DaemonError {
            message: Some(message),
            code,
        }) => Error::StreamTrailer { message, code },
        _ => Error::StreamTrailer {
            message: raw.to_string(),
            code: None,
        },
    }
}
