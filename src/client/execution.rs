//! Request execution logic (single attempt).
//!
//! One call walks `Building -> Sent -> {Failed | StreamingBody} -> Closed`. `Closed` is
//! reached inside the body stream (see [`crate::pipeline::ByteStream`]); everything before
//! it happens here. Nothing is retried.

use crate::client::error_classification::{classify, ErrorResponse};
use crate::pipeline::ByteStream;
use crate::request::{self, RequestOptions, RequestSpec, Resource};
use crate::response::Response;
use crate::signal::compose;
use crate::transport::OutgoingRequest;
use crate::Result;
use bytes::Bytes;
use http::HeaderValue;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::core::Client;

const REQUEST_ID_HEADER: &str = "x-request-id";

impl Client {
    /// Build and send one request.
    ///
    /// Resolves once response headers arrive; the body is read lazily from the returned
    /// [`Response`]. Non-2xx responses fail with [`crate::Error::Http`] unless
    /// `throw_http_errors(false)` is set.
    pub async fn fetch(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        let request_id = Uuid::new_v4().to_string();
        debug!(request_id = %request_id, state = "building", "kubo-rpc call");
        let spec = request::build(&self.config, resource, options)?;
        self.execute_with_id(spec, request_id).await
    }

    /// Send a prebuilt request.
    pub async fn execute(&self, spec: RequestSpec) -> Result<Response> {
        self.execute_with_id(spec, Uuid::new_v4().to_string()).await
    }

    async fn execute_with_id(&self, spec: RequestSpec, request_id: String) -> Result<Response> {
        let span = tracing::debug_span!("kubo_rpc_call", request_id = %request_id);
        self.execute_once(spec, request_id).instrument(span).await
    }

    async fn execute_once(&self, spec: RequestSpec, request_id: String) -> Result<Response> {
        let RequestSpec {
            method,
            url,
            mut headers,
            body,
            timeout,
            signal,
            transform,
            handle_error,
            throw_http_errors,
        } = spec;

        // The composed signal lives until the body is closed; every early return drops it,
        // which detaches it from the caller's signal and stops the timer.
        let composed = compose([signal], timeout)?;

        if !headers.contains_key(REQUEST_ID_HEADER) {
            if let Ok(v) = HeaderValue::from_str(&request_id) {
                headers.insert(REQUEST_ID_HEADER, v);
            }
        }

        let endpoint = url.path().to_string();
        let start = Instant::now();
        debug!(method = %method, endpoint = endpoint.as_str(), state = "sent", "kubo-rpc call");

        let outgoing = OutgoingRequest {
            method,
            url,
            headers,
            body,
        };
        let sent = tokio::select! {
            biased;
            reason = composed.signal().aborted() => Err(reason.into_error()),
            r = self.transport.send(outgoing) => r,
        };

        let raw = match sent {
            Ok(raw) => raw,
            Err(e) => {
                composed.clear();
                info!(
                    endpoint = endpoint.as_str(),
                    duration_ms = start.elapsed().as_millis(),
                    error = %e,
                    state = "failed",
                    "kubo-rpc request failed"
                );
                return Err(e);
            }
        };

        let status = raw.status.as_u16();
        if !raw.status.is_success() && throw_http_errors {
            let body = ByteStream::new(raw.body, Some(composed), None, request_id.as_str())
                .collect_bytes()
                .await;
            let body = match body {
                Ok(b) => b,
                Err(e) if e.is_aborted() || e.is_timeout() => return Err(e),
                Err(e) => {
                    warn!(http_status = status, error = %e, "failed to read error response body");
                    Bytes::new()
                }
            };

            let err = classify(
                &ErrorResponse {
                    status,
                    headers: raw.headers,
                    body,
                },
                handle_error.as_ref(),
            );
            info!(
                http_status = status,
                endpoint = endpoint.as_str(),
                duration_ms = start.elapsed().as_millis(),
                error = %err,
                state = "failed",
                "kubo-rpc request failed"
            );
            return Err(err);
        }

        debug!(
            http_status = status,
            endpoint = endpoint.as_str(),
            duration_ms = start.elapsed().as_millis(),
            body = ?raw.body.kind(),
            state = "streaming_body",
            "kubo-rpc response received"
        );

        Ok(Response::new(
            raw.status,
            raw.headers,
            raw.url,
            raw.body,
            Some(composed),
            transform,
            request_id,
        ))
    }
}
