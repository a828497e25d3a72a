//! Request construction.
//!
//! [`build`] merges the client's [`ClientConfig`] with one call's [`RequestOptions`] into an
//! immutable [`RequestSpec`]. It performs no I/O.

mod query;

pub use query::{kebab_case_keys, SearchParams, SearchParamsTransform};

use crate::client::error_classification::ErrorHook;
use crate::config::ClientConfig;
use crate::signal::AbortSignal;
use crate::timeout::Timeout;
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Applied to every NDJSON record before it is yielded.
pub type RecordTransform = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Outgoing request body.
pub enum RequestBody {
    Empty,
    Bytes(Bytes),
    /// Lazily produced upload, e.g. a multipart body built by the caller.
    Stream(BoxStream<'static, Bytes>),
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Empty
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(b: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(b))
    }
}

/// Per-call options. Unset fields fall back to the client defaults.
#[derive(Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub search_params: SearchParams,
    /// Positional arguments, sent as repeated `arg` parameters.
    pub args: Vec<String>,
    pub json: Option<Value>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Timeout>,
    pub signal: Option<AbortSignal>,
    pub transform: Option<RecordTransform>,
    pub transform_search_params: Option<SearchParamsTransform>,
    pub handle_error: Option<ErrorHook>,
    pub throw_http_errors: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.search_params.append(key, value);
        self
    }

    /// Set a flag only when a value is present.
    pub fn param_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.json = Some(value);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn transform_search_params<F>(mut self, f: F) -> Self
    where
        F: Fn(SearchParams) -> SearchParams + Send + Sync + 'static,
    {
        self.transform_search_params = Some(Arc::new(f));
        self
    }

    pub fn handle_error(mut self, hook: ErrorHook) -> Self {
        self.handle_error = Some(hook);
        self
    }

    pub fn throw_http_errors(mut self, enable: bool) -> Self {
        self.throw_http_errors = Some(enable);
        self
    }
}

/// A fully resolved request. Owned by exactly one in-flight call.
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
    pub signal: Option<AbortSignal>,
    pub transform: Option<RecordTransform>,
    pub handle_error: Option<ErrorHook>,
    pub throw_http_errors: bool,
}

impl std::fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .field("transform", &self.transform.is_some())
            .field("handle_error", &self.handle_error.is_some())
            .field("throw_http_errors", &self.throw_http_errors)
            .finish()
    }
}

/// What a call targets.
#[derive(Debug)]
pub enum Resource {
    /// Command path relative to the API prefix, or an absolute `http(s)` URL string.
    Path(String),
    Url(Url),
    Prebuilt(Box<RequestSpec>),
}

impl From<&str> for Resource {
    fn from(s: &str) -> Self {
        Resource::Path(s.to_string())
    }
}

impl From<String> for Resource {
    fn from(s: String) -> Self {
        Resource::Path(s)
    }
}

impl From<Url> for Resource {
    fn from(u: Url) -> Self {
        Resource::Url(u)
    }
}

impl From<RequestSpec> for Resource {
    fn from(spec: RequestSpec) -> Self {
        Resource::Prebuilt(Box::new(spec))
    }
}

fn check_scheme(url: Url) -> Result<Url> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::invalid_resource(format!(
            "unsupported URL scheme '{}' in {}",
            other, url
        ))),
    }
}

fn resolve_url(config: &ClientConfig, resource: Resource) -> Result<Url> {
    match resource {
        Resource::Url(url) => check_scheme(url),
        Resource::Path(path) => {
            let trimmed = path.trim();
            if trimmed.is_empty() {
                return Err(Error::invalid_resource("empty resource path"));
            }
            match Url::parse(trimmed) {
                Ok(url) => check_scheme(url),
                Err(url::ParseError::RelativeUrlWithoutBase) => config.endpoint(trimmed),
                Err(e) => Err(Error::invalid_resource(format!(
                    "cannot parse '{}': {}",
                    trimmed, e
                ))),
            }
        }
        Resource::Prebuilt(_) => Err(Error::invalid_resource(
            "prebuilt requests are not re-resolved",
        )),
    }
}

/// Merge `config` defaults with `options` into a [`RequestSpec`].
///
/// Per-call values win; unset per-call values keep the default. A prebuilt spec is
/// returned unchanged.
pub fn build(
    config: &ClientConfig,
    resource: impl Into<Resource>,
    options: RequestOptions,
) -> Result<RequestSpec> {
    let resource = resource.into();
    if let Resource::Prebuilt(spec) = resource {
        return Ok(*spec);
    }
    let mut url = resolve_url(config, resource)?;

    let mut headers = config.headers.clone();
    // `extend` replaces existing values for every name it carries
    headers.extend(options.headers);

    let mut params: SearchParams = url.query_pairs().into_owned().collect();
    params.merge(config.search_params.clone());
    params.merge(options.search_params);

    let timeout = options.timeout.or_else(|| config.timeout.clone());
    let timeout = match timeout {
        Some(t) => {
            let duration = t.duration()?;
            if duration.is_some() && !params.contains_key("timeout") {
                params.set("timeout", t.to_query_value()?);
            }
            duration
        }
        None => None,
    };

    for arg in options.args {
        params.append("arg", arg);
    }

    if let Some(transform) = options
        .transform_search_params
        .or_else(|| config.transform_search_params.clone())
    {
        params = transform(params);
    }

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&params.encode()));
    }

    let body = match options.json {
        Some(value) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            RequestBody::Bytes(Bytes::from(serde_json::to_vec(&value)?))
        }
        None => options.body.unwrap_or_default(),
    };

    Ok(RequestSpec {
        method: options.method.unwrap_or(Method::GET),
        url,
        headers,
        body,
        timeout,
        signal: options.signal,
        transform: options.transform,
        handle_error: options.handle_error,
        throw_http_errors: options
            .throw_http_errors
            .unwrap_or(config.throw_http_errors),
    })
}
