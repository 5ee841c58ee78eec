//! Task polling utilities
//!
//! The GUI never blocks on a request: it spawns the call on the tokio runtime
//! and checks the handle once per frame.

use futures::FutureExt;
use tokio::task::JoinHandle;

/// Result of polling a task
pub enum PollResult<T> {
    /// No task to poll (task was None)
    NoTask,
    /// Task is still running
    Pending,
    /// Task completed with result (may be Ok or join error)
    Complete(Result<T, tokio::task::JoinError>),
}

/// Poll an optional task handle and take its result if finished.
///
/// The handle is only cleared once its output has actually been taken, so a
/// task that reports finished but is not yet ready is polled again next frame.
pub fn poll_task<T>(task: &mut Option<JoinHandle<T>>) -> PollResult<T> {
    let Some(handle) = task.as_mut() else {
        return PollResult::NoTask;
    };

    if !handle.is_finished() {
        return PollResult::Pending;
    }

    match handle.now_or_never() {
        Some(result) => {
            *task = None;
            PollResult::Complete(result)
        }
        None => {
            tracing::warn!("Task not ready despite is_finished()");
            PollResult::Pending
        }
    }
}
