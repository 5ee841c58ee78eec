//! UI modules for Plotdo
//!
//! Rendering code, organized by tab.

mod components;
mod messages_tab;
mod plot_tab;
mod settings_tab;
pub mod theme;
mod todos_tab;

pub use components::{render_about_dialog, render_tab};
pub use messages_tab::render_messages_tab;
pub use plot_tab::render_plot_tab;
pub use settings_tab::render_settings_tab;
pub use todos_tab::render_todos_tab;
