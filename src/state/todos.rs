//! To-do screen state
//!
//! The list shown on screen is a read-only copy of what the backend returned
//! last. It is never patched locally: every successful insert is followed by
//! a full re-fetch.

use std::future::Future;
use std::sync::Arc;

use eframe::egui;

use crate::backend::{ApiError, Backend, TodoItem};
use crate::lifecycle::{PollStatus, RequestController, RequestState, TransitionError};
use crate::retry::{RetryPolicy, retry_when};
use crate::state::StateEvent;

/// Failure message for blank to-do text
pub const EMPTY_TODO_ERROR: &str = "to-do text must not be empty";

/// To-do list cache, the new-item form, and their two operations
pub struct TodosState {
    backend: Arc<dyn Backend>,
    retry: RetryPolicy,
    /// Text entered in the new-item form
    pub draft: String,
    /// Fetch of the whole list
    pub list: RequestController<Vec<TodoItem>>,
    /// Insert of one item
    pub add: RequestController<()>,
    /// Last list returned by the backend, newest first
    items: Vec<TodoItem>,
    /// An insert finished while a fetch was still running
    refresh_queued: bool,
}

fn fetch_list(
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
) -> impl Future<Output = Result<Vec<TodoItem>, ApiError>> + Send + 'static {
    async move { retry_when(policy, || backend.list_todos(), ApiError::is_retryable).await }
}

fn insert(
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
    text: String,
) -> impl Future<Output = Result<(), ApiError>> + Send + 'static {
    async move {
        if text.is_empty() {
            return Err(ApiError::Validation(EMPTY_TODO_ERROR.to_string()));
        }
        retry_when(policy, || backend.add_todo(&text), ApiError::is_retryable).await
    }
}

impl TodosState {
    pub fn new(backend: Arc<dyn Backend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            draft: String::new(),
            list: RequestController::new("fetch to-do list"),
            add: RequestController::new("add to-do"),
            items: Vec::new(),
            refresh_queued: false,
        }
    }

    /// Cached to-do items, in server order
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Whether the add control should be enabled
    pub fn can_add(&self) -> bool {
        !self.add.is_pending()
    }

    fn cache_list(&mut self) {
        if let Some(items) = self.list.state().payload() {
            self.items = items.clone();
        }
    }

    /// Re-fetch the list and wait for the outcome
    pub async fn refresh(&mut self) -> Result<&RequestState<Vec<TodoItem>>, TransitionError> {
        let call = fetch_list(self.backend.clone(), self.retry);
        self.list.run(call).await?;
        self.cache_list();
        Ok(self.list.state())
    }

    /// Insert an item and, if that worked, re-fetch the list
    pub async fn add(&mut self, text: &str) -> Result<&RequestState<()>, TransitionError> {
        let call = insert(self.backend.clone(), self.retry, text.trim().to_string());
        let added = self.add.run(call).await?.payload().is_some();

        if added {
            self.refresh().await?;
        }
        Ok(self.add.state())
    }

    /// Start a background list fetch
    pub fn spawn_refresh(&mut self) -> Option<StateEvent> {
        let call = fetch_list(self.backend.clone(), self.retry);
        match self.list.spawn(call) {
            Ok(()) => Some(StateEvent::StatusMessage("Loading to-do list...".to_string())),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    /// Start a background insert of the draft text
    pub fn spawn_add(&mut self) -> Option<StateEvent> {
        let text = self.draft.trim().to_string();
        let call = insert(self.backend.clone(), self.retry, text.clone());
        match self.add.spawn(call) {
            Ok(()) => Some(StateEvent::StatusMessage(format!("Adding \"{}\"...", text))),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    /// Poll both background operations
    pub fn poll(&mut self, ctx: &egui::Context) -> Vec<StateEvent> {
        let mut events = Vec::new();

        match self.add.poll() {
            PollStatus::Settled => {
                if let Some(msg) = self.add.state().error() {
                    events.push(StateEvent::LogError(format!("Failed to add to-do: {}", msg)));
                    events.push(StateEvent::StatusMessage(format!("Error: {}", msg)));
                } else {
                    events.push(StateEvent::LogInfo(format!("Added to-do: {}", self.draft.trim())));
                    self.draft.clear();
                    if self.list.is_pending() {
                        self.refresh_queued = true;
                    } else {
                        events.extend(self.spawn_refresh());
                    }
                }
            }
            PollStatus::InFlight => ctx.request_repaint(),
            PollStatus::Idle => {}
        }

        match self.list.poll() {
            PollStatus::Settled => {
                match self.list.state() {
                    RequestState::Succeeded(items) => {
                        events.push(StateEvent::StatusMessage(format!(
                            "Loaded {} to-do items",
                            items.len()
                        )));
                    }
                    RequestState::Failed(msg) => {
                        events.push(StateEvent::LogError(format!(
                            "Failed to fetch to-do list: {}",
                            msg
                        )));
                        events.push(StateEvent::StatusMessage(format!("Error: {}", msg)));
                    }
                    RequestState::Idle | RequestState::Pending => {}
                }
                self.cache_list();

                if std::mem::take(&mut self.refresh_queued) {
                    events.extend(self.spawn_refresh());
                }
            }
            PollStatus::InFlight => ctx.request_repaint(),
            PollStatus::Idle => {}
        }

        events
    }
}
