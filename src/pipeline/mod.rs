//! Response body decoding.
//!
//! # Pipeline Stages
//!
//! ```text
//! BodySource ──> ByteStream ──> NdjsonFramer ──> transform ──> records
//!  (tagged)      cancellation,   UTF-8 + line      per-call
//!                trailers,       framing
//!                release
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BodySource`] | Tagged body representation, classified once by the transport |
//! | [`ByteStream`] | Lazy byte view; releases the body exactly once |
//! | [`NdjsonFramer`] | Chunk-boundary independent line framer |
//! | [`NdjsonStream`] | Lazy record view over a [`ByteStream`] |
//! | [`StreamTermination`] | How a body ended, including trailer-reported errors |

pub mod body;
pub mod decode;


pub use body::{BodyKind, BodySource, ByteStream, NativeBody, StreamTermination};
pub use decode::{parse_line, NdjsonFramer, NdjsonStream};
