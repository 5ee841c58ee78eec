//! Screen state modules
//!
//! Each screen owns one `RequestController` per independent operation plus the
//! form fields that feed it. Screens are built per app session; nothing here is
//! process-wide.

mod message;
mod plot;
mod todos;
mod ui;

pub use message::MessageState;
pub use plot::{AMPLITUDE_ERROR, PlotState};
pub use todos::{EMPTY_TODO_ERROR, TodosState};
pub use ui::{Tab, UiState};

/// Events that state poll methods can return.
/// These communicate results back to PlotdoApp without direct mutation.
#[derive(Debug)]
pub enum StateEvent {
    /// Update the status message
    StatusMessage(String),

    /// Log an error message
    LogError(String),

    /// Log an info message
    LogInfo(String),

    /// A new plot image is ready to be turned into a texture
    PlotReady,
}
