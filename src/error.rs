use http::HeaderMap;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or option that caused the error (e.g., "options.timeout", "config.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the offending value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "request_builder", "timeout")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for RPC calls.
///
/// The first six variants are the call taxonomy: every failure of a call surfaces as exactly
/// one of them. The remaining variants cover building a call and local I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, DNS or body I/O failure.
    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// The call's deadline elapsed, or the daemon reported its own deadline being exceeded.
    #[error("Request timed out{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Timeout { message: Option<String> },

    /// The caller cancelled the call.
    #[error("The operation was aborted")]
    Aborted,

    /// Non-2xx response from the daemon.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        code: Option<i64>,
        headers: HeaderMap,
    },

    /// A 200 response whose stream was terminated by an `X-Stream-Error` trailer.
    ///
    /// Output delivered before this error may be incomplete.
    #[error("Stream error reported by daemon: {message}")]
    StreamTrailer { message: String, code: Option<i64> },

    /// A well-framed NDJSON line (or JSON body) that is not valid JSON.
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Invalid resource: {message}")]
    InvalidResource { message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn invalid_resource(msg: impl Into<String>) -> Self {
        Error::InvalidResource {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// True for errors raised after part of a stream was already delivered.
    pub fn is_stream_trailer(&self) -> bool {
        matches!(self, Error::StreamTrailer { .. })
    }
}
