//! Simulated backend for offline demos and tests.
//!
//! Plot requests sleep for a configurable delay and return a fixed 1x1 PNG.
//! To-do items live in memory, newest first. Tests can queue failures; each
//! queued error is consumed by the next call of any operation.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ApiError, Backend, EchoReply, PlotImage, TIMESTAMP_FORMAT, TodoId, TodoItem};

/// Image returned by the simulated plot endpoint (a 1x1 PNG)
pub const MOCK_PLOT_IMAGE: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const STATUS_MESSAGE: &str = "Initial connection check successful. Database initialized.";

/// Number of calls received per operation
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub status: usize,
    pub echo: usize,
    pub list: usize,
    pub add: usize,
    pub plot: usize,
}

#[cfg(test)]
impl CallCounts {
    pub fn total(&self) -> usize {
        self.status + self.echo + self.list + self.add + self.plot
    }
}

#[derive(Default)]
struct Counters {
    status: AtomicUsize,
    echo: AtomicUsize,
    list: AtomicUsize,
    add: AtomicUsize,
    plot: AtomicUsize,
}

/// In-process implementation of [`Backend`]
pub struct MockBackend {
    plot_delay: Duration,
    todos: Mutex<Vec<TodoItem>>,
    failures: Mutex<VecDeque<ApiError>>,
    counters: Counters,
}

impl MockBackend {
    pub fn new(plot_delay: Duration) -> Self {
        Self {
            plot_delay,
            todos: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    /// Make the next call (of any operation) fail with `err`
    #[cfg(test)]
    pub fn fail_next(&self, err: ApiError) {
        lock(&self.failures).push_back(err);
    }

    #[cfg(test)]
    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            status: c.status.load(Ordering::SeqCst),
            echo: c.echo.load(Ordering::SeqCst),
            list: c.list.load(Ordering::SeqCst),
            add: c.add.load(Ordering::SeqCst),
            plot: c.plot.load(Ordering::SeqCst),
        }
    }

    fn record(&self, counter: &AtomicUsize) -> Result<(), ApiError> {
        counter.fetch_add(1, Ordering::SeqCst);
        match lock(&self.failures).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Backend for MockBackend {
    fn describe(&self) -> String {
        "simulated backend".to_string()
    }

    async fn status_message(&self) -> Result<String, ApiError> {
        self.record(&self.counters.status)?;
        Ok(STATUS_MESSAGE.to_string())
    }

    async fn echo_message(&self, message: &str) -> Result<EchoReply, ApiError> {
        self.record(&self.counters.echo)?;
        Ok(EchoReply {
            message: format!("Received your message: '{}'. Processed successfully.", message),
            original_message: message.to_string(),
        })
    }

    async fn list_todos(&self) -> Result<Vec<TodoItem>, ApiError> {
        self.record(&self.counters.list)?;
        Ok(lock(&self.todos).clone())
    }

    async fn add_todo(&self, text: &str) -> Result<(), ApiError> {
        self.record(&self.counters.add)?;
        let mut todos = lock(&self.todos);
        let next_id = todos.iter().map(|t| t.id.0).max().unwrap_or(0) + 1;
        todos.insert(
            0,
            TodoItem {
                id: TodoId(next_id),
                text: text.to_string(),
                created_at: Some(chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()),
            },
        );
        Ok(())
    }

    async fn generate_plot(&self, amplitude: f64) -> Result<PlotImage, ApiError> {
        self.record(&self.counters.plot)?;
        tokio::time::sleep(self.plot_delay).await;
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(ApiError::Validation("amplitude must be positive".to_string()));
        }
        Ok(PlotImage::new(MOCK_PLOT_IMAGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_todos_newest_first() {
        let backend = MockBackend::default();
        backend.add_todo("first").await.unwrap();
        backend.add_todo("second").await.unwrap();

        let items = backend.list_todos().await.unwrap();
        let texts: Vec<&str> = items.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
        assert_eq!(items[0].id, TodoId(2));
        assert!(items[0].created().is_some());
    }

    #[tokio::test]
    async fn test_queued_failure_is_consumed_once() {
        let backend = MockBackend::default();
        backend.fail_next(ApiError::Transport("connection refused".into()));

        assert!(backend.status_message().await.is_err());
        assert!(backend.status_message().await.is_ok());
        assert_eq!(backend.calls().status, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plot_waits_for_delay() {
        let backend = MockBackend::new(Duration::from_millis(1500));
        let start = tokio::time::Instant::now();

        let image = backend.generate_plot(2.5).await.unwrap();

        assert_eq!(image.as_base64(), MOCK_PLOT_IMAGE);
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(backend.calls(), CallCounts { plot: 1, ..Default::default() });
    }

    #[tokio::test]
    async fn test_echo() {
        let backend = MockBackend::default();
        let reply = backend.echo_message("hi").await.unwrap();
        assert_eq!(reply.original_message, "hi");
        assert!(reply.message.contains("'hi'"));
        assert_eq!(backend.calls().total(), 1);
    }
}
