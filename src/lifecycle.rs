//! Request lifecycle for a single screen operation.
//!
//! A [`RequestController`] owns the [`RequestState`] of one operation (status
//! check, list fetch, item creation, message echo, plot generation) and is the
//! only thing allowed to change it:
//!
//! ```text
//!   Idle ──start──▶ Pending ──resolve──▶ Succeeded(payload)
//!    ▲                 │
//!    │                 └────reject────▶ Failed(message)
//!    └─────────────reset (from anywhere)
//! ```
//!
//! `start` is refused while Pending, so at most one call per operation is ever
//! in flight. Operations are driven either by [`RequestController::run`], which
//! suspends until the call settles, or by [`RequestController::spawn`] plus
//! [`RequestController::poll`] from the GUI frame loop.

use std::future::Future;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::backend::ApiError;
use crate::task::{PollResult, poll_task};

/// Failure message for a [`RequestController::run`] future dropped mid-call
pub const CANCELLED_ERROR: &str = "cancelled";

/// Observable state of one operation
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Pending,
    Succeeded(T),
    Failed(String),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            RequestState::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Pending => "pending",
            RequestState::Succeeded(_) => "succeeded",
            RequestState::Failed(_) => "failed",
        }
    }
}

/// A transition that the current state does not allow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} {operation} while {state}")]
pub struct TransitionError {
    pub operation: &'static str,
    pub action: &'static str,
    pub state: &'static str,
}

/// What a call to [`RequestController::poll`] observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// No spawned call
    Idle,
    /// Spawned call still running
    InFlight,
    /// Spawned call finished and the state was updated this poll
    Settled,
}

/// Drives the [`RequestState`] of one named operation
pub struct RequestController<T> {
    operation: &'static str,
    state: RequestState<T>,
    task: Option<JoinHandle<Result<T, ApiError>>>,
    started_at: Option<Instant>,
}

impl<T> RequestController<T> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            state: RequestState::Idle,
            task: None,
            started_at: None,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    fn refuse(&self, action: &'static str) -> TransitionError {
        TransitionError {
            operation: self.operation,
            action,
            state: self.state.label(),
        }
    }

    /// Enter Pending, discarding any previous result or error
    pub fn start(&mut self) -> Result<(), TransitionError> {
        if self.state.is_pending() {
            return Err(self.refuse("start"));
        }
        self.state = RequestState::Pending;
        self.started_at = Some(Instant::now());
        tracing::debug!("{}: pending", self.operation);
        Ok(())
    }

    pub fn resolve(&mut self, payload: T) -> Result<(), TransitionError> {
        if !self.state.is_pending() {
            return Err(self.refuse("resolve"));
        }
        self.state = RequestState::Succeeded(payload);
        tracing::debug!("{}: succeeded{}", self.operation, self.elapsed_suffix());
        Ok(())
    }

    pub fn reject(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        if !self.state.is_pending() {
            return Err(self.refuse("reject"));
        }
        let message = message.into();
        tracing::debug!("{}: failed{}: {}", self.operation, self.elapsed_suffix(), message);
        self.state = RequestState::Failed(message);
        Ok(())
    }

    /// Return to Idle.
    ///
    /// A spawned call that is still running is detached: it runs to
    /// completion but its result is dropped.
    pub fn reset(&mut self) {
        if self.task.take().is_some() {
            tracing::debug!("{}: detached in-flight call", self.operation);
        }
        self.state = RequestState::Idle;
        self.started_at = None;
    }

    /// Resolve or reject from a finished call
    pub fn settle(&mut self, result: Result<T, ApiError>) -> Result<(), TransitionError> {
        match result {
            Ok(payload) => self.resolve(payload),
            Err(e) => self.reject(e.to_string()),
        }
    }

    fn elapsed_suffix(&self) -> String {
        self.started_at
            .map(|t| format!(" in {:.1}s", t.elapsed().as_secs_f32()))
            .unwrap_or_default()
    }

    /// Start the operation, wait for `call` to settle and record the outcome.
    ///
    /// Dropping the returned future before `call` finishes, e.g. under a
    /// caller-side timeout, leaves the operation Failed with
    /// [`CANCELLED_ERROR`] instead of stuck in Pending.
    pub async fn run<F>(&mut self, call: F) -> Result<&RequestState<T>, TransitionError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        self.start()?;
        let guard = CancelOnDrop(&mut *self);
        let result = call.await;
        guard.0.settle(result)?;
        drop(guard);
        Ok(&self.state)
    }

    /// Start the operation and run `call` on the tokio runtime.
    ///
    /// Completion is picked up by [`RequestController::poll`].
    pub fn spawn<F>(&mut self, call: F) -> Result<(), TransitionError>
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Send + 'static,
    {
        self.start()?;
        self.task = Some(tokio::spawn(call));
        Ok(())
    }

    /// Check the spawned call and settle the state once it has finished
    pub fn poll(&mut self) -> PollStatus {
        let outcome = match poll_task(&mut self.task) {
            PollResult::NoTask => return PollStatus::Idle,
            PollResult::Pending => return PollStatus::InFlight,
            PollResult::Complete(Ok(result)) => self.settle(result),
            PollResult::Complete(Err(e)) => {
                tracing::error!("{}: task panicked: {}", self.operation, e);
                self.reject(format!("Task panicked: {}", e))
            }
        };

        if let Err(e) = outcome {
            tracing::warn!("Dropping late result: {}", e);
        }
        PollStatus::Settled
    }
}

/// Rejects a still-pending controller when its `run` future is dropped
struct CancelOnDrop<'a, T>(&'a mut RequestController<T>);

impl<T> Drop for CancelOnDrop<'_, T> {
    fn drop(&mut self) {
        if self.0.is_pending() {
            tracing::debug!("{} dropped while pending", self.0.operation());
            let _ = self.0.reject(CANCELLED_ERROR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settled<T>(controller: &RequestController<T>) -> bool {
        !controller.is_pending()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut op: RequestController<u32> = RequestController::new("fetch");
        assert_eq!(op.state(), &RequestState::Idle);

        op.start().unwrap();
        assert!(op.is_pending());

        op.resolve(5).unwrap();
        assert_eq!(op.state(), &RequestState::Succeeded(5));
        assert_eq!(op.state().payload(), Some(&5));

        op.start().unwrap();
        assert_eq!(op.state(), &RequestState::Pending);
        assert_eq!(op.state().payload(), None);

        op.reject("offline").unwrap();
        assert_eq!(op.state().error(), Some("offline"));

        op.start().unwrap();
        assert_eq!(op.state().error(), None);
    }

    #[test]
    fn test_start_while_pending_is_refused() {
        let mut op: RequestController<()> = RequestController::new("submit");
        op.start().unwrap();

        let err = op.start().unwrap_err();
        assert_eq!(err.to_string(), "cannot start submit while pending");
        assert!(op.is_pending());
    }

    #[test]
    fn test_settle_requires_pending() {
        let mut op: RequestController<u32> = RequestController::new("fetch");
        assert!(op.resolve(1).is_err());
        assert!(op.reject("nope").is_err());
        assert_eq!(op.state(), &RequestState::Idle);

        op.start().unwrap();
        op.resolve(1).unwrap();
        assert!(op.resolve(2).is_err());
        assert!(op.reject("late").is_err());
        assert_eq!(op.state(), &RequestState::Succeeded(1));
    }

    #[test]
    fn test_reset_from_terminal_states() {
        let mut op: RequestController<String> = RequestController::new("fetch");

        op.start().unwrap();
        op.resolve("data".to_string()).unwrap();
        op.reset();
        assert_eq!(op.state(), &RequestState::Idle);
        assert_eq!(op.state().payload(), None);

        op.start().unwrap();
        op.reject("broken").unwrap();
        op.reset();
        assert_eq!(op.state(), &RequestState::Idle);
        assert_eq!(op.state().error(), None);
    }

    #[test]
    fn test_settle_maps_error_message() {
        let mut op: RequestController<()> = RequestController::new("fetch");
        op.start().unwrap();
        op.settle(Err(ApiError::HttpStatus { status: 500, message: "boom".into() }))
            .unwrap();
        assert_eq!(op.state().error(), Some("Server returned 500: boom"));
    }

    #[tokio::test]
    async fn test_run_suspends_until_settled() {
        let mut op: RequestController<u32> = RequestController::new("fetch");
        let state = op.run(async { Ok(3) }).await.unwrap();
        assert_eq!(state, &RequestState::Succeeded(3));

        let state = op
            .run(async { Err(ApiError::Transport("refused".into())) })
            .await
            .unwrap();
        assert_eq!(state.error(), Some("Could not reach the backend: refused"));
    }

    #[tokio::test]
    async fn test_spawn_and_poll() {
        let mut op: RequestController<u32> = RequestController::new("fetch");
        assert_eq!(op.poll(), PollStatus::Idle);

        op.spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(9)
        })
        .unwrap();
        assert_eq!(op.poll(), PollStatus::InFlight);
        assert!(op.spawn(async { Ok(1) }).is_err());

        while !settled(&op) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            op.poll();
        }
        assert_eq!(op.state(), &RequestState::Succeeded(9));
        assert_eq!(op.poll(), PollStatus::Idle);
    }

    #[tokio::test]
    async fn test_reset_detaches_spawned_call() {
        let mut op: RequestController<u32> = RequestController::new("fetch");
        op.spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(9)
        })
        .unwrap();

        op.reset();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(op.poll(), PollStatus::Idle);
        assert_eq!(op.state(), &RequestState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_is_cancelled() {
        let mut op: RequestController<u32> = RequestController::new("fetch");
        let call = std::future::pending::<Result<u32, ApiError>>();

        let outcome = tokio::time::timeout(Duration::from_millis(10), op.run(call)).await;
        assert!(outcome.is_err());
        assert!(!op.is_pending());
        assert_eq!(op.state().error(), Some(CANCELLED_ERROR));

        // A cancelled operation can be started again
        assert_eq!(op.run(async { Ok(4) }).await.unwrap(), &RequestState::Succeeded(4));
    }
}
