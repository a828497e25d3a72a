//! Network seam.
//!
//! [`Transport`] is the one capability the [`crate::Client`] depends on: send a request,
//! resolve once the response head is in, and hand back the body as a classified
//! [`BodySource`]. [`HttpTransport`] is the `reqwest` implementation; tests inject their own.

mod http;

pub use self::http::HttpTransport;

use crate::pipeline::BodySource;
use crate::request::RequestBody;
use crate::Result;
use ::http::{HeaderMap, Method, StatusCode};
use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use url::Url;

/// What goes over the wire for one call.
#[derive(Debug)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Response head plus an unread body.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    pub body: BodySource,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue exactly one request. Resolves when headers are received, not when the body ends.
    ///
    /// Cancellation is applied by the caller dropping this future.
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse>;
}

/// Collect a streaming upload into one buffer.
///
/// Browser fetch rejects streamed request bodies, so on such targets uploads are
/// materialized in memory before sending.
pub async fn materialize_body(body: RequestBody) -> Result<RequestBody> {
    match body {
        RequestBody::Stream(mut stream) => {
            let mut buf = BytesMut::new();
            while let Some(chunk) = stream.next().await {
                buf.extend_from_slice(&chunk?);
            }
            Ok(RequestBody::Bytes(buf.freeze()))
        }
        other => Ok(other),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for crate::Error {
    fn from(e: reqwest::Error) -> Self {
        crate::Error::Transport(TransportError::Http(e))
    }
}
