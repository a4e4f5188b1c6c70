//! Detached background execution.
//!
//! Fire-and-forget helpers for work whose result nobody waits on: cache
//! warmups, best-effort notifications, cleanup sweeps. A panic inside the
//! task is caught and logged, never propagated to the caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;

/// Run a future on its own task without waiting for it.
///
/// Dropping the returned handle detaches the task; awaiting it is optional.
pub fn spawn_detached<F>(task_name: impl Into<String>, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let name = task_name.into();
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(future).catch_unwind().await {
            tracing::error!(
                task = %name,
                panic = %panic_message(panic.as_ref()),
                "background task panicked"
            );
        }
    })
}

/// Run a blocking closure on its own task without waiting for it.
pub fn spawn_blocking_detached<F>(task_name: impl Into<String>, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    let name = task_name.into();
    tokio::task::spawn_blocking(move || {
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
            tracing::error!(
                task = %name,
                panic = %panic_message(panic.as_ref()),
                "background task panicked"
            );
        }
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "opaque panic payload"
    }
}
