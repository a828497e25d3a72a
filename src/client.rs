//! RPC client.
//!
//! A [`Client`] is a value object built from a [`crate::transport::Transport`] and an
//! immutable [`crate::ClientConfig`]; it carries no other state between calls.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod error_classification;
mod execution;

pub use builder::ClientBuilder;
pub use core::Client;
pub use error_classification::{ErrorHook, ErrorResponse};
