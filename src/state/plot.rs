//! Plot screen state

use std::future::Future;
use std::sync::Arc;

use eframe::egui;

use crate::backend::{ApiError, Backend, PlotImage};
use crate::lifecycle::{PollStatus, RequestController, RequestState, TransitionError};
use crate::retry::{RetryPolicy, retry_when};
use crate::state::StateEvent;

/// Failure message for a non-positive amplitude
pub const AMPLITUDE_ERROR: &str = "amplitude must be positive";

/// Plot form and the generate-plot operation
pub struct PlotState {
    backend: Arc<dyn Backend>,
    retry: RetryPolicy,
    /// Amplitude entered in the form
    pub amplitude: f64,
    /// The generate-plot operation
    pub request: RequestController<PlotImage>,
}

/// Build the generate-plot call.
///
/// An amplitude that is not a finite positive number fails right away without
/// touching the backend, regardless of the retry policy.
fn generate(
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
    amplitude: f64,
) -> impl Future<Output = Result<PlotImage, ApiError>> + Send + 'static {
    async move {
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(ApiError::Validation(AMPLITUDE_ERROR.to_string()));
        }
        retry_when(policy, || backend.generate_plot(amplitude), ApiError::is_retryable).await
    }
}

impl PlotState {
    pub fn new(backend: Arc<dyn Backend>, retry: RetryPolicy, amplitude: f64) -> Self {
        Self {
            backend,
            retry,
            amplitude,
            request: RequestController::new("generate plot"),
        }
    }

    /// Whether the submit control should be enabled
    pub fn can_submit(&self) -> bool {
        !self.request.is_pending()
    }

    /// Generate a plot and wait for the outcome
    pub async fn submit(
        &mut self,
        amplitude: f64,
    ) -> Result<&RequestState<PlotImage>, TransitionError> {
        self.amplitude = amplitude;
        let call = generate(self.backend.clone(), self.retry, amplitude);
        self.request.run(call).await
    }

    /// Start generating a plot for the form's amplitude in the background
    pub fn spawn_submit(&mut self) -> Option<StateEvent> {
        let amplitude = self.amplitude;
        let call = generate(self.backend.clone(), self.retry, amplitude);

        match self.request.spawn(call) {
            Ok(()) => Some(StateEvent::StatusMessage(format!(
                "Generating plot (A = {:.2})...",
                amplitude
            ))),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    /// Poll the background request for completion
    pub fn poll(&mut self, ctx: &egui::Context) -> Vec<StateEvent> {
        let mut events = Vec::new();

        match self.request.poll() {
            PollStatus::Settled => match self.request.state() {
                RequestState::Succeeded(_) => {
                    events.push(StateEvent::StatusMessage("Plot generated".to_string()));
                    events.push(StateEvent::LogInfo(format!(
                        "Plot generated for amplitude {:.2}",
                        self.amplitude
                    )));
                    events.push(StateEvent::PlotReady);
                }
                RequestState::Failed(msg) => {
                    events.push(StateEvent::LogError(format!("Plot generation failed: {}", msg)));
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
