//! Adapters between the canonical async surface and callback/channel call
//! shapes.
//!
//! Every execution method in this crate is an `async fn`; these adapters wrap
//! any such future exactly once, so the three call shapes cannot diverge in
//! behaviour. They resolve or invoke exactly once per completion.

use std::future::Future;

use tokio::sync::oneshot;

use crate::error::Result;

/// Run a future and hand its result to a callback on the runtime.
pub fn with_callback<T, F, C>(future: F, callback: C)
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
    C: FnOnce(Result<T>) + Send + 'static,
{
    tokio::spawn(async move {
        callback(future.await);
    });
}

/// Run a future and expose its single result as a channel receiver.
pub fn into_channel<T, F>(future: F) -> oneshot::Receiver<Result<T>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        // Receiver may have been dropped; that is the caller discarding the
        // result, not an error.
        let _ = tx.send(future.await);
    });
    rx
}
