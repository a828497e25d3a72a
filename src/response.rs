//! A successful (or, with `throw_http_errors(false)`, any) response with an unread body.

use crate::client::error_classification::STREAM_ERROR_HEADER;
use crate::pipeline::{BodySource, ByteStream, NdjsonStream};
use crate::request::RecordTransform;
use crate::signal::ComposedSignal;
use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Response head plus a body that can be read once, in one mode.
///
/// Every body accessor takes `self`, so a body cannot be read twice or in two modes. The
/// call's cancellation signal travels with the body and is released when the body ends or
/// the response is dropped.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: BodySource,
    signal: Option<ComposedSignal>,
    transform: Option<RecordTransform>,
    request_id: String,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("request_id", &self.request_id)
            .finish()
    }
}

impl Response {
    pub(crate) fn new(
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        body: BodySource,
        signal: Option<ComposedSignal>,
        transform: Option<RecordTransform>,
        request_id: String,
    ) -> Self {
        Self {
            status,
            headers,
            url,
            body,
            signal,
            transform,
            request_id,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Correlation id sent as `x-request-id` and recorded in logs.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Lazy byte view of the body.
    pub fn bytes_stream(self) -> ByteStream {
        let head_error = self
            .headers
            .get(STREAM_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        ByteStream::new(self.body, self.signal, head_error, self.request_id)
    }

    /// Lazy NDJSON record view of the body, with the call's transform applied.
    pub fn ndjson(mut self) -> NdjsonStream {
        let transform = self.transform.take();
        NdjsonStream::new(self.bytes_stream(), transform)
    }

    /// Whole body.
    pub async fn bytes(self) -> Result<Bytes> {
        self.bytes_stream().collect_bytes().await
    }

    /// Whole body as UTF-8 text (lossy).
    pub async fn text(self) -> Result<String> {
        let b = self.bytes().await?;
        Ok(String::from_utf8_lossy(&b).into_owned())
    }

    /// Whole body as one JSON value.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let b = self.bytes().await?;
        serde_json::from_slice(&b).map_err(Error::Decode)
    }
}
