//! Cooperative cancellation.
//!
//! An [`AbortSignal`] is a subscribe/unsubscribe capability plus a "has fired" flag. Signals
//! are created by an [`AbortController`] (caller cancellation) or internally by the composer
//! (timeouts), and merged per call by [`compose`].
//!
//! ```rust,no_run
//! use kubo_rpc::signal::AbortController;
//!
//! let controller = AbortController::new();
//! let signal = controller.signal();
//! // hand `signal` to a call, then later:
//! controller.abort();
//! assert!(signal.is_aborted());
//! ```

pub mod compose;

pub use compose::{compose, ComposedSignal};

use crate::Error;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use tokio_util::sync::CancellationToken;

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Caller-initiated cancellation.
    Aborted,
    /// A deadline elapsed.
    TimedOut,
}

impl AbortReason {
    /// The error a call observing this reason fails with.
    pub fn into_error(self) -> Error {
        match self {
            AbortReason::Aborted => Error::Aborted,
            AbortReason::TimedOut => Error::Timeout { message: None },
        }
    }
}

/// Handle returned by [`AbortSignal::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnOnce(AbortReason) + Send>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<ListenerId, Listener>,
}

struct Inner {
    token: CancellationToken,
    reason: OnceLock<AbortReason>,
    listeners: Mutex<Listeners>,
}

/// A cancellation signal that fires at most once.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal")
            .field("reason", &self.reason())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl AbortSignal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                reason: OnceLock::new(),
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.inner.reason.get().copied()
    }

    /// Register a listener called once when the signal fires.
    ///
    /// If the signal already fired the listener runs immediately and `None` is returned.
    pub fn subscribe<F>(&self, listener: F) -> Option<ListenerId>
    where
        F: FnOnce(AbortReason) + Send + 'static,
    {
        {
            let mut listeners = match self.inner.listeners.lock() {
                Ok(l) => l,
                Err(poisoned) => poisoned.into_inner(),
            };
            // `fire` sets the reason before draining under this lock, so checking here
            // cannot miss a concurrent fire.
            if self.inner.reason.get().is_none() {
                let id = ListenerId(listeners.next_id);
                listeners.next_id += 1;
                listeners.entries.insert(id, Box::new(listener));
                return Some(id);
            }
        }
        if let Some(reason) = self.reason() {
            listener(reason);
        }
        None
    }

    /// Remove a listener. Returns false if it was already removed or already called.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        match self.inner.listeners.lock() {
            Ok(mut l) => l.entries.remove(&id).is_some(),
            Err(poisoned) => poisoned.into_inner().entries.remove(&id).is_some(),
        }
    }

    /// Number of listeners currently attached to this signal.
    pub fn listener_count(&self) -> usize {
        match self.inner.listeners.lock() {
            Ok(l) => l.entries.len(),
            Err(poisoned) => poisoned.into_inner().entries.len(),
        }
    }

    /// Resolves once the signal has fired.
    pub async fn aborted(&self) -> AbortReason {
        self.inner.token.cancelled().await;
        self.reason().unwrap_or(AbortReason::Aborted)
    }

    /// Fire the signal. Returns false if it had already fired.
    pub(crate) fn fire(&self, reason: AbortReason) -> bool {
        if self.inner.reason.set(reason).is_err() {
            return false;
        }
        let drained = match self.inner.listeners.lock() {
            Ok(mut l) => std::mem::take(&mut l.entries),
            Err(poisoned) => std::mem::take(&mut poisoned.into_inner().entries),
        };
        self.inner.token.cancel();
        for (_, listener) in drained {
            listener(reason);
        }
        true
    }
}

/// Owner side of a caller-supplied [`AbortSignal`].
#[derive(Debug, Clone)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(),
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Cancel every call holding this controller's signal.
    pub fn abort(&self) {
        self.signal.fire(AbortReason::Aborted);
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}
