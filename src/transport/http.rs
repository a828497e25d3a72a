use super::{materialize_body, OutgoingRequest, RawResponse, Transport, TransportError};
use crate::config::ClientConfig;
use crate::pipeline::BodySource;
use crate::request::RequestBody;
use crate::Result;
use async_trait::async_trait;
use reqwest::Proxy;
use std::time::Duration;
use tracing::debug;

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    buffer_stream_uploads: bool,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            // Calls are bounded by their composed signal; only connection setup is bounded here.
            .connect_timeout(Duration::from_secs(30))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy_url {
            match Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => {
                    return Err(crate::Error::configuration_with_context(
                        format!("invalid proxy URL: {}", e),
                        crate::ErrorContext::new()
                            .with_field_path("proxy_url")
                            .with_source("http_transport"),
                    ))
                }
            }
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            buffer_stream_uploads: config.buffer_stream_uploads,
        })
    }

    /// Wrap an existing `reqwest::Client` (shared pool, custom TLS, ...).
    pub fn with_client(client: reqwest::Client, buffer_stream_uploads: bool) -> Self {
        Self {
            client,
            buffer_stream_uploads,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse> {
        let body = if self.buffer_stream_uploads {
            materialize_body(request.body).await?
        } else {
            request.body
        };

        let mut req = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        req = match body {
            RequestBody::Empty => req,
            RequestBody::Bytes(b) => req.body(b),
            RequestBody::Stream(s) => req.body(reqwest::Body::wrap_stream(s)),
        };

        let resp = req.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let url = resp.url().clone();
        debug!(http_status = status.as_u16(), url = url.as_str(), "response head received");

        // The body keeps its frames (including trailers) until the decoder reads them.
        let body = BodySource::native(reqwest::Body::from(resp));

        Ok(RawResponse {
            status,
            headers,
            url,
            body,
        })
    }
}
