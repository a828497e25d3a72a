//! Response bodies as one lazy byte stream.
//!
//! A body arrives in one of three representations, classified once at the transport boundary
//! into [`BodySource`]. [`ByteStream`] reads any of them, races every read against the call's
//! cancellation signal, watches for the `X-Stream-Error` trailer, and releases the underlying
//! resource exactly once, whether the body is exhausted, fails, or is dropped early.

use crate::client::error_classification::{parse_stream_error, STREAM_ERROR_HEADER};
use crate::signal::{AbortReason, AbortSignal, ComposedSignal};
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use http::HeaderMap;
use http_body_util::BodyExt;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// A body that yields data frames and, possibly, a trailer frame.
pub type NativeBody = Pin<Box<dyn http_body::Body<Data = Bytes, Error = Error> + Send + 'static>>;

type BoxReader = Pin<Box<dyn AsyncRead + Send + 'static>>;

/// Tagged body representation.
pub enum BodySource {
    /// Already a stream of byte chunks.
    AlreadyIterable(BoxStream<'static, Bytes>),
    /// A reader pulled through a buffer.
    ReaderBased(ReaderStream<BoxReader>),
    /// An `http_body::Body`, the only representation that can carry trailers.
    NativeAsyncIterable(NativeBody),
}

/// Discriminant of a [`BodySource`], for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    AlreadyIterable,
    ReaderBased,
    NativeAsyncIterable,
}

impl std::fmt::Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BodySource::{:?}", self.kind())
    }
}

enum BodyFrame {
    Data(Bytes),
    Trailers(HeaderMap),
}

impl BodySource {
    pub fn iterable<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        BodySource::AlreadyIterable(Box::pin(stream))
    }

    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        let reader: BoxReader = Box::pin(reader);
        BodySource::ReaderBased(ReaderStream::new(reader))
    }

    pub fn native<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Error>,
    {
        BodySource::NativeAsyncIterable(Box::pin(body.map_err(Into::into)))
    }

    pub fn empty() -> Self {
        BodySource::iterable(stream::empty())
    }

    pub fn kind(&self) -> BodyKind {
        match self {
            BodySource::AlreadyIterable(_) => BodyKind::AlreadyIterable,
            BodySource::ReaderBased(_) => BodyKind::ReaderBased,
            BodySource::NativeAsyncIterable(_) => BodyKind::NativeAsyncIterable,
        }
    }

    async fn next_frame(&mut self) -> Option<Result<BodyFrame>> {
        match self {
            BodySource::AlreadyIterable(s) => s.next().await.map(|r| r.map(BodyFrame::Data)),
            BodySource::ReaderBased(r) => r
                .next()
                .await
                .map(|r| r.map(BodyFrame::Data).map_err(Error::Io)),
            BodySource::NativeAsyncIterable(b) => loop {
                let frame = match b.frame().await? {
                    Ok(frame) => frame,
                    Err(e) => return Some(Err(e)),
                };
                match frame.into_data() {
                    Ok(data) => return Some(Ok(BodyFrame::Data(data))),
                    Err(frame) => {
                        if let Ok(trailers) = frame.into_trailers() {
                            return Some(Ok(BodyFrame::Trailers(trailers)));
                        }
                        // unknown frame kinds carry nothing for us
                    }
                }
            },
        }
    }
}

/// How a body stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTermination {
    EndedCleanly,
    /// The daemon reported an error after streaming part of the output.
    EndedWithTrailerError { message: String, code: Option<i64> },
    Cancelled(AbortReason),
    Failed(String),
}

pub(crate) type TerminationSlot = Arc<Mutex<Option<StreamTermination>>>;

pub(crate) fn record(slot: &TerminationSlot, how: StreamTermination) {
    if let Ok(mut t) = slot.lock() {
        if t.is_none() {
            *t = Some(how);
        }
    }
}

/// Record `how` even if the byte view already recorded an ending.
///
/// A body can end cleanly at the byte level while its last line still fails to decode.
pub(crate) fn overwrite(slot: &TerminationSlot, how: StreamTermination) {
    if let Ok(mut t) = slot.lock() {
        *t = Some(how);
    }
}

pub(crate) fn read(slot: &TerminationSlot) -> Option<StreamTermination> {
    slot.lock().ok().and_then(|t| t.clone())
}

struct ByteState {
    source: Option<BodySource>,
    composed: Option<ComposedSignal>,
    abort: Option<AbortSignal>,
    head_error: Option<String>,
    termination: TerminationSlot,
    request_id: String,
}

impl ByteState {
    /// Release the body and the call's signal. Safe to call repeatedly.
    fn close(&mut self, how: StreamTermination) {
        if self.source.take().is_some() {
            debug!(request_id = %self.request_id, termination = ?how, "response body closed");
        }
        if let Some(composed) = self.composed.take() {
            composed.clear();
        }
        record(&self.termination, how);
    }

    fn trailer_error(&mut self, raw: &str) -> Error {
        let err = parse_stream_error(raw);
        let how = match &err {
            Error::StreamTrailer { message, code } => StreamTermination::EndedWithTrailerError {
                message: message.clone(),
                code: *code,
            },
            other => StreamTermination::Failed(other.to_string()),
        };
        self.close(how);
        err
    }
}

impl Drop for ByteState {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            debug!(request_id = %self.request_id, kind = ?source.kind(), "response body released before end of stream");
            drop(source);
        }
        if let Some(composed) = self.composed.take() {
            composed.clear();
        }
    }
}

/// Lazy stream of body chunks. Dropping it early releases the body.
pub struct ByteStream {
    inner: BoxStream<'static, Bytes>,
    termination: TerminationSlot,
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("termination", &self.termination())
            .finish()
    }
}

impl ByteStream {
    /// Stream `source`, observing `composed` for cancellation and releasing it on close.
    ///
    /// `head_error` is an `X-Stream-Error` value already present on the response head; it is
    /// reported after the body if no trailer reports one first.
    pub fn new(
        source: BodySource,
        composed: Option<ComposedSignal>,
        head_error: Option<String>,
        request_id: impl Into<String>,
    ) -> Self {
        let termination: TerminationSlot = Arc::new(Mutex::new(None));
        let state = ByteState {
            source: Some(source),
            abort: composed.as_ref().map(|c| c.signal().clone()),
            composed,
            head_error,
            termination: termination.clone(),
            request_id: request_id.into(),
        };

        let inner = stream::unfold(state, |mut st| async move {
            loop {
                let source = st.source.as_mut()?;
                let next = match &st.abort {
                    Some(abort) => tokio::select! {
                        biased;
                        reason = abort.aborted() => Err(reason),
                        frame = source.next_frame() => Ok(frame),
                    },
                    None => Ok(source.next_frame().await),
                };

                match next {
                    Err(reason) => {
                        st.close(StreamTermination::Cancelled(reason));
                        return Some((Err(reason.into_error()), st));
                    }
                    Ok(Some(Ok(BodyFrame::Data(chunk)))) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        return Some((Ok(chunk), st));
                    }
                    Ok(Some(Ok(BodyFrame::Trailers(trailers)))) => {
                        let raw = trailers
                            .get(STREAM_ERROR_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .map(str::trim)
                            .filter(|v| !v.is_empty())
                            .map(str::to_string);
                        if let Some(raw) = raw {
                            let err = st.trailer_error(&raw);
                            return Some((Err(err), st));
                        }
                    }
                    Ok(Some(Err(e))) => {
                        st.close(StreamTermination::Failed(e.to_string()));
                        return Some((Err(e), st));
                    }
                    Ok(None) => {
                        if let Some(raw) = st.head_error.take() {
                            let err = st.trailer_error(&raw);
                            return Some((Err(err), st));
                        }
                        st.close(StreamTermination::EndedCleanly);
                        return None;
                    }
                }
            }
        });

        Self {
            inner: Box::pin(inner.fuse()),
            termination,
        }
    }

    /// Plain stream without a call around it.
    pub fn from_source(source: BodySource) -> Self {
        Self::new(source, None, None, "")
    }

    /// How the stream ended, once it has.
    pub fn termination(&self) -> Option<StreamTermination> {
        read(&self.termination)
    }

    pub(crate) fn termination_slot(&self) -> TerminationSlot {
        self.termination.clone()
    }

    /// Collect the whole body.
    pub async fn collect_bytes(mut self) -> Result<Bytes> {
        let mut buf = bytes::BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
