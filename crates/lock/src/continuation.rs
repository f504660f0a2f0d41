//! Suspended requesters and how they are woken.

use lockyard_errors::Error;
use lockyard_types::Grant;
use tokio::sync::oneshot;

/// Handle to a requester suspended in the wait queue
///
/// `resume` is called at most once, after the grant is committed. Dropping
/// the handle without resuming means the requester was withdrawn.
pub trait RequesterContinuation: Send {
    fn resume(self: Box<Self>, grant: Grant);
}

/// Continuation backed by a oneshot channel, see [`park`]
#[derive(Debug)]
pub struct ParkedRequester {
    tx: oneshot::Sender<Grant>,
}

impl RequesterContinuation for ParkedRequester {
    fn resume(self: Box<Self>, grant: Grant) {
        if self.tx.send(grant).is_err() {
            tracing::debug!("parked requester went away before its grant arrived");
        }
    }
}

/// Waiting side of a [`ParkedRequester`]
#[derive(Debug)]
pub struct GrantReceiver {
    rx: oneshot::Receiver<Grant>,
}

impl GrantReceiver {
    /// Wait for the grant
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when the queue entry was withdrawn.
    pub async fn wait(self) -> Result<Grant, Error> {
        self.rx.await.map_err(|_| Error::Cancelled)
    }
}

/// Create a continuation and the receiver its grant is delivered to
#[must_use]
pub fn park() -> (ParkedRequester, GrantReceiver) {
    let (tx, rx) = oneshot::channel();
    (ParkedRequester { tx }, GrantReceiver { rx })
}

/// Continuation that runs a callback
pub struct CallbackContinuation<F>(F);

impl<F> RequesterContinuation for CallbackContinuation<F>
where
    F: FnOnce(Grant) + Send,
{
    fn resume(self: Box<Self>, grant: Grant) {
        (self.0)(grant);
    }
}

/// Wrap a callback as a boxed continuation
pub fn from_fn<F>(callback: F) -> Box<dyn RequesterContinuation>
where
    F: FnOnce(Grant) + Send + 'static,
{
    Box::new(CallbackContinuation(callback))
}
