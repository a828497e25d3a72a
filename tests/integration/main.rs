//! Integration tests against a mock daemon.


mod error_handling;
mod streaming;
mod trailers;
