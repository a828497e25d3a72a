//! NDJSON decoding (Bytes -> JSON Value).
//!
//! [`NdjsonFramer`] is the synchronous core: streaming UTF-8 decoding plus line framing that
//! is independent of how the body was chunked. [`NdjsonStream`] drives it over a
//! [`ByteStream`].

use super::body::{overwrite, read, ByteStream, StreamTermination, TerminationSlot};
use crate::request::RecordTransform;
use crate::{BoxStream, Error, Result};
use futures::{stream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Incremental line framer over arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub struct NdjsonFramer {
    /// Decoded text not yet terminated by a newline.
    buf: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
}

impl NdjsonFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the completed, trimmed, non-empty lines it closes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let from = self.scanned;
        self.decode(chunk);
        match self.buf[from..].rfind('\n') {
            Some(i) => {
                let rest = self.buf.split_off(from + i + 1);
                let complete = std::mem::replace(&mut self.buf, rest);
                self.scanned = self.buf.len();
                split_lines(&complete)
            }
            None => {
                self.scanned = self.buf.len();
                Vec::new()
            }
        }
    }

    /// End of input: flush the decoder and return the final unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.buf.push(char::REPLACEMENT_CHARACTER);
        }
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buf);
        let line = rest.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }

    /// Streaming UTF-8 decode: complete characters are appended, an incomplete trailing
    /// sequence waits for the next chunk, invalid bytes become U+FFFD.
    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(s) => {
                    self.buf.push_str(s);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buf
                        .push_str(&String::from_utf8_lossy(&self.pending[start..start + valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.buf.push(char::REPLACEMENT_CHARACTER);
                            start += valid + bad;
                        }
                        None => {
                            start += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse one framed line.
pub fn parse_line(line: &str) -> Result<Value> {
    serde_json::from_str(line).map_err(Error::Decode)
}

struct NdjsonState {
    bytes: Option<ByteStream>,
    framer: NdjsonFramer,
    ready: VecDeque<String>,
    transform: Option<RecordTransform>,
    /// Trailer error to report once the lines before it are delivered.
    deferred: Option<Error>,
    termination: TerminationSlot,
}

impl NdjsonState {
    fn stop(&mut self) {
        self.bytes = None;
        self.ready.clear();
        self.deferred = None;
    }
}

/// Lazy stream of NDJSON records.
///
/// Ends at the first error. Records yielded before a [`Error::StreamTrailer`] were
/// delivered by the daemon before it failed and may be incomplete.
pub struct NdjsonStream {
    inner: BoxStream<'static, Value>,
    termination: TerminationSlot,
}

impl std::fmt::Debug for NdjsonStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonStream")
            .field("termination", &self.termination())
            .finish()
    }
}

impl NdjsonStream {
    pub fn new(bytes: ByteStream, transform: Option<RecordTransform>) -> Self {
        let termination = bytes.termination_slot();
        let state = NdjsonState {
            bytes: Some(bytes),
            framer: NdjsonFramer::new(),
            ready: VecDeque::new(),
            transform,
            deferred: None,
            termination: termination.clone(),
        };

        let inner = stream::unfold(state, |mut st| async move {
            loop {
                if let Some(line) = st.ready.pop_front() {
                    let parsed = parse_line(&line).and_then(|v| match &st.transform {
                        Some(t) => t(v),
                        None => Ok(v),
                    });
                    if let Err(e) = &parsed {
                        overwrite(&st.termination, StreamTermination::Failed(e.to_string()));
                        st.stop();
                    }
                    return Some((parsed, st));
                }
                if let Some(err) = st.deferred.take() {
                    st.stop();
                    return Some((Err(err), st));
                }

                let bytes = st.bytes.as_mut()?;
                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        let lines = st.framer.push(&chunk);
                        st.ready.extend(lines);
                    }
                    Some(Err(e)) if e.is_stream_trailer() => {
                        // everything before the trailer is complete output
                        st.ready.extend(st.framer.finish());
                        st.deferred = Some(e);
                        st.bytes = None;
                    }
                    Some(Err(e)) => {
                        st.stop();
                        return Some((Err(e), st));
                    }
                    None => {
                        st.ready.extend(st.framer.finish());
                        st.bytes = None;
                    }
                }
            }
        });

        Self {
            inner: Box::pin(inner.fuse()),
            termination,
        }
    }

    /// How the underlying body ended, once it has.
    pub fn termination(&self) -> Option<StreamTermination> {
        read(&self.termination)
    }

    /// Deserialize each record into `T`.
    pub fn typed<T>(self) -> BoxStream<'static, T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Box::pin(self.map(|r| r.and_then(|v| serde_json::from_value(v).map_err(Error::Decode))))
    }

    /// Collect every record, failing on the first error.
    pub async fn try_collect_vec(mut self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        while let Some(v) = self.next().await {
            out.push(v?);
        }
        Ok(out)
    }
}

impl Stream for NdjsonStream {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
