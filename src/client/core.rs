use crate::config::ClientConfig;
use crate::pipeline::{ByteStream, NdjsonStream};
use crate::request::{RequestOptions, Resource};
use crate::response::Response;
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use http::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Client for the daemon's HTTP RPC API.
///
/// Cheap to clone; clones share the transport (and its connection pool) and the config.
#[derive(Clone)]
pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: Arc<ClientConfig>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client for the default daemon address, with `KUBO_RPC_*` environment overrides.
    pub fn new() -> Result<Self> {
        crate::client::builder::ClientBuilder::new().build()
    }

    pub fn builder() -> crate::client::builder::ClientBuilder {
        crate::client::builder::ClientBuilder::new()
    }

    /// Client over the `reqwest` transport with exactly `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(transport, config))
    }

    /// Client over any transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.fetch(resource, options.method(Method::GET)).await
    }

    /// Every daemon command is a POST.
    pub async fn post(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.fetch(resource, options.method(Method::POST)).await
    }

    pub async fn put(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.fetch(resource, options.method(Method::PUT)).await
    }

    pub async fn delete(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.fetch(resource, options.method(Method::DELETE)).await
    }

    pub async fn head(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.fetch(resource, options.method(Method::HEAD)).await
    }

    pub async fn options(
        &self,
        resource: impl Into<Resource>,
        options: RequestOptions,
    ) -> Result<Response> {
        self.fetch(resource, options.method(Method::OPTIONS)).await
    }

    /// POST a command and parse its single JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.post(path, options).await?.json().await
    }

    /// POST a command whose output is one JSON record per line.
    pub async fn post_ndjson(&self, path: &str, options: RequestOptions) -> Result<NdjsonStream> {
        Ok(self.post(path, options).await?.ndjson())
    }

    /// POST a command whose output is raw bytes.
    pub async fn post_bytes(&self, path: &str, options: RequestOptions) -> Result<ByteStream> {
        Ok(self.post(path, options).await?.bytes_stream())
    }
}
