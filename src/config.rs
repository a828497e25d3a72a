//! Immutable client configuration.
//!
//! A `ClientConfig` is built once (usually through [`crate::ClientBuilder`], which applies the
//! `KUBO_RPC_*` environment overrides) and cloned into every call as the defaults the
//! per-call [`crate::request::RequestOptions`] are merged over.

use crate::request::{kebab_case_keys, SearchParams, SearchParamsTransform};
use crate::timeout::Timeout;
use http::header::{HeaderMap, HeaderValue, USER_AGENT};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_API_PATH: &str = "/api/v0";

// Parsed once from a constant; `default_base_url_parses` pins it.
static DEFAULT_URL: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL"));

#[derive(Clone)]
pub struct ClientConfig {
    /// Daemon address, e.g. `http://127.0.0.1:5001`.
    pub base_url: Url,
    /// Prefix joined between `base_url` and relative command paths.
    pub api_path: String,
    /// Headers sent with every call.
    pub headers: HeaderMap,
    /// Query parameters sent with every call.
    pub search_params: SearchParams,
    /// Default call timeout.
    pub timeout: Option<Timeout>,
    /// Turn non-2xx responses into [`crate::Error::Http`].
    pub throw_http_errors: bool,
    pub transform_search_params: Option<SearchParamsTransform>,
    /// Collect streaming upload bodies into memory before sending.
    ///
    /// Browser fetch cannot stream request bodies, so this defaults to on for `wasm32`.
    pub buffer_stream_uploads: bool,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_path", &self.api_path)
            .field("headers", &self.headers)
            .field("search_params", &self.search_params)
            .field("timeout", &self.timeout)
            .field("throw_http_errors", &self.throw_http_errors)
            .field(
                "transform_search_params",
                &self.transform_search_params.is_some(),
            )
            .field("buffer_stream_uploads", &self.buffer_stream_uploads)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("kubo-rpc/", env!("CARGO_PKG_VERSION"))),
        );
        Self {
            base_url: DEFAULT_URL.clone(),
            api_path: DEFAULT_API_PATH.to_string(),
            headers,
            search_params: SearchParams::new(),
            timeout: None,
            throw_http_errors: true,
            transform_search_params: Some(Arc::new(kebab_case_keys)),
            buffer_stream_uploads: cfg!(target_arch = "wasm32"),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
        }
    }
}

impl ClientConfig {
    /// Absolute URL of `path` under the API prefix.
    pub(crate) fn endpoint(&self, path: &str) -> crate::Result<Url> {
        let prefix = self.api_path.trim_matches('/');
        let path = path.trim_start_matches('/');
        let joined = if prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", prefix, path)
        };
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        base.join(&joined).map_err(|e| {
            crate::Error::invalid_resource(format!("cannot join '{}' onto {}: {}", path, base, e))
        })
    }
}
