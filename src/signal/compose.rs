//! Merging cancellation sources into the one signal a call observes.

use super::{AbortReason, AbortSignal, ListenerId};
use crate::{Error, ErrorContext, Result};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Attachments {
    sources: Vec<(AbortSignal, ListenerId)>,
    timer: Option<JoinHandle<()>>,
    cleared: bool,
}

impl Attachments {
    /// Take everything out so it can be released without holding the lock.
    fn take(&mut self) -> (Vec<(AbortSignal, ListenerId)>, Option<JoinHandle<()>>) {
        (std::mem::take(&mut self.sources), self.timer.take())
    }
}

fn release(sources: Vec<(AbortSignal, ListenerId)>, timer: Option<JoinHandle<()>>) {
    for (source, id) in sources {
        source.unsubscribe(id);
    }
    if let Some(timer) = timer {
        timer.abort();
    }
}

fn detach(attachments: &Weak<Mutex<Attachments>>) {
    let Some(attachments) = attachments.upgrade() else {
        return;
    };
    let taken = match attachments.lock() {
        Ok(mut a) => a.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    release(taken.0, taken.1);
}

/// The single cancellation signal of one call.
///
/// Holds listeners on every source until it fires or is cleared. Dropping it clears it.
pub struct ComposedSignal {
    signal: AbortSignal,
    attachments: Arc<Mutex<Attachments>>,
}

impl std::fmt::Debug for ComposedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedSignal")
            .field("signal", &self.signal)
            .field("has_timer", &self.has_timer())
            .finish()
    }
}

/// Merge `sources` and an optional timeout into one [`ComposedSignal`].
///
/// `None` sources are skipped. A zero timeout installs no timer. The timer needs a Tokio
/// runtime; composing a timeout outside one is a configuration error.
pub fn compose<I>(sources: I, timeout: Option<Duration>) -> Result<ComposedSignal>
where
    I: IntoIterator<Item = Option<AbortSignal>>,
{
    let composed = ComposedSignal {
        signal: AbortSignal::new(),
        attachments: Arc::new(Mutex::new(Attachments::default())),
    };

    let mut sources: Vec<AbortSignal> = sources.into_iter().flatten().collect();

    let mut timer = None;
    if let Some(timeout) = timeout.filter(|d| !d.is_zero()) {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration_with_context(
                "a timeout requires a Tokio runtime",
                ErrorContext::new()
                    .with_field_path("options.timeout")
                    .with_details(e.to_string())
                    .with_source("signal_composer"),
            )
        })?;
        let timer_signal = AbortSignal::new();
        let fire = timer_signal.clone();
        timer = Some(handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            fire.fire(AbortReason::TimedOut);
        }));
        sources.push(timer_signal);
    }

    if let Ok(mut a) = composed.attachments.lock() {
        a.timer = timer;
    }

    for source in sources {
        if composed.signal.is_aborted() {
            break;
        }
        let target = composed.signal.clone();
        let attachments = Arc::downgrade(&composed.attachments);
        let listener = move |reason: AbortReason| {
            if target.fire(reason) {
                detach(&attachments);
            }
        };
        // `None` means the source had already fired and the listener ran synchronously.
        if let Some(id) = source.subscribe(listener) {
            let mut a = match composed.attachments.lock() {
                Ok(a) => a,
                Err(poisoned) => poisoned.into_inner(),
            };
            if a.cleared {
                drop(a);
                source.unsubscribe(id);
            } else {
                a.sources.push((source, id));
            }
        }
    }

    // A source that fired during composition may have detached before later sources attached.
    if composed.signal.is_aborted() {
        composed.clear();
    }

    Ok(composed)
}

impl ComposedSignal {
    /// The merged signal to hand to the network layer.
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.signal.reason()
    }

    /// Whether a timeout timer is still pending.
    pub fn has_timer(&self) -> bool {
        match self.attachments.lock() {
            Ok(a) => a.timer.as_ref().map(|t| !t.is_finished()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Remove every listener installed on the sources and cancel the timer.
    ///
    /// Must run on every exit path of a call; `Drop` calls it. Idempotent.
    pub fn clear(&self) {
        let taken = match self.attachments.lock() {
            Ok(mut a) => {
                a.cleared = true;
                a.take()
            }
            Err(poisoned) => {
                let mut a = poisoned.into_inner();
                a.cleared = true;
                a.take()
            }
        };
        release(taken.0, taken.1);
    }
}

impl Drop for ComposedSignal {
    fn drop(&mut self) {
        self.clear();
    }
}
