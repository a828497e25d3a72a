//! # kubo-rpc
//!
//! Streaming HTTP client for the Kubo daemon's RPC API (`/api/v0/<command>`).
//!
//! ## Overview
//!
//! Every command is an HTTP POST whose arguments travel as query parameters. Responses come
//! back in one of three shapes, and this crate exposes each as a lazy, typed value:
//!
//! - a single JSON value ([`Response::json`])
//! - newline-delimited JSON, one record per line ([`Response::ndjson`])
//! - raw bytes ([`Response::bytes_stream`])
//!
//! Long-running streaming commands may fail *after* a 200 response by sending an
//! `X-Stream-Error` trailer. That failure surfaces as [`Error::StreamTrailer`] at the point
//! it is observed; records already yielded are not retracted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use kubo_rpc::{Client, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> kubo_rpc::Result<()> {
//!     let client = Client::builder()
//!         .base_url("http://127.0.0.1:5001")
//!         .timeout("30s")
//!         .build()?;
//!
//!     let version = kubo_rpc::api::version(&client, RequestOptions::new()).await?;
//!     println!("daemon {}", version.version);
//!
//!     let mut gc = client.post_ndjson("repo/gc", RequestOptions::new()).await?;
//!     while let Some(record) = gc.next().await {
//!         println!("{}", record?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client value object, builder, execution and error classification |
//! | [`request`] | Merging defaults with per-call options into a request |
//! | [`signal`] | Abort signals and their per-call composition with timeouts |
//! | [`transport`] | The network seam and its `reqwest` implementation |
//! | [`pipeline`] | Byte and NDJSON views over response bodies |
//! | [`api`] | Representative daemon commands |

pub mod api;
pub mod client;
pub mod config;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod signal;
pub mod timeout;
pub mod transport;

pub use client::{Client, ClientBuilder, ErrorHook, ErrorResponse};
pub use config::ClientConfig;
pub use pipeline::{BodySource, ByteStream, NdjsonStream, StreamTermination};
pub use request::{RequestBody, RequestOptions, RequestSpec, Resource, SearchParams};
pub use response::Response;
pub use signal::{AbortController, AbortReason, AbortSignal};
pub use timeout::Timeout;

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
