//! Message screen state: backend status check and message echo

use std::future::Future;
use std::sync::Arc;

use eframe::egui;

use crate::backend::{ApiError, Backend, EchoReply};
use crate::lifecycle::{PollStatus, RequestController, RequestState, TransitionError};
use crate::retry::{RetryPolicy, retry_when};
use crate::state::StateEvent;

/// Failure message for a blank echo message
pub const EMPTY_MESSAGE_ERROR: &str = "message must not be empty";

fn status_call(
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
) -> impl Future<Output = Result<String, ApiError>> + Send + 'static {
    async move { retry_when(policy, || backend.status_message(), ApiError::is_retryable).await }
}

/// Echo is sent once; a repeated POST would echo twice
fn echo_call(
    backend: Arc<dyn Backend>,
    text: String,
) -> impl Future<Output = Result<EchoReply, ApiError>> + Send + 'static {
    async move {
        if text.is_empty() {
            return Err(ApiError::Validation(EMPTY_MESSAGE_ERROR.to_string()));
        }
        backend.echo_message(&text).await
    }
}

pub struct MessageState {
    backend: Arc<dyn Backend>,
    retry: RetryPolicy,
    /// Connection check against `/api/message`
    pub status: RequestController<String>,
    /// Text entered in the echo form
    pub echo_input: String,
    /// Echo round-trip
    pub echo: RequestController<EchoReply>,
}

impl MessageState {
    pub fn new(backend: Arc<dyn Backend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            status: RequestController::new("status check"),
            echo_input: String::new(),
            echo: RequestController::new("echo message"),
        }
    }

    pub async fn check_status(&mut self) -> Result<&RequestState<String>, TransitionError> {
        let call = status_call(self.backend.clone(), self.retry);
        self.status.run(call).await
    }

    pub async fn send_echo(&mut self, text: &str) -> Result<&RequestState<EchoReply>, TransitionError> {
        let call = echo_call(self.backend.clone(), text.trim().to_string());
        self.echo.run(call).await
    }

    pub fn spawn_check_status(&mut self) -> Option<StateEvent> {
        let call = status_call(self.backend.clone(), self.retry);
        match self.status.spawn(call) {
            Ok(()) => Some(StateEvent::StatusMessage("Checking backend...".to_string())),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    pub fn spawn_echo(&mut self) -> Option<StateEvent> {
        let call = echo_call(self.backend.clone(), self.echo_input.trim().to_string());
        match self.echo.spawn(call) {
            Ok(()) => Some(StateEvent::StatusMessage("Sending message...".to_string())),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    /// Poll both background operations
    pub fn poll(&mut self, ctx: &egui::Context) -> Vec<StateEvent> {
        let mut events = Vec::new();

        match self.status.poll() {
            PollStatus::Settled => match self.status.state() {
                RequestState::Succeeded(message) => {
                    events.push(StateEvent::StatusMessage("Backend reachable".to_string()));
                    events.push(StateEvent::LogInfo(format!("Backend says: {}", message)));
                }
                RequestState::Failed(msg) => {
                    events.push(StateEvent::LogError(format!("Status check failed: {}", msg)));
                    events.push(StateEvent::StatusMessage(format!("Error: {}", msg)));
                }
                RequestState::Idle | RequestState::Pending => {}
            },
            PollStatus::InFlight => ctx.request_repaint(),
            PollStatus::Idle => {}
        }

        match self.echo.poll() {
            PollStatus::Settled => match self.echo.state() {
                RequestState::Succeeded(_) => {
                    events.push(StateEvent::StatusMessage("Message echoed".to_string()));
                }
                RequestState::Failed(msg) => {
                    events.push(StateEvent::LogError(format!("Echo failed: {}", msg)));
                    events.push(StateEvent::StatusMessage(format!("Error: {}", msg)));
                }
                RequestState::Idle | RequestState::Pending => {}
            },
            PollStatus::InFlight => ctx.request_repaint(),
            PollStatus::Idle => {}
        }

        events
    }
}
