//! UI-related application state

use eframe::egui;

use crate::ui::theme::Theme;

/// Application tabs, one per screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    /// Amplitude form and generated plot
    #[default]
    Plot,
    /// To-do list and new-item form
    Todos,
    /// Backend status and message echo
    Messages,
    /// Backend, retry and appearance settings
    Settings,
}

/// UI-related state
pub struct UiState {
    /// Current theme
    pub current_theme: Theme,
    /// Currently selected tab
    pub active_tab: Tab,
    /// Whether theme needs to be applied
    pub theme_dirty: bool,
    /// Text shown in the status bar
    pub status_message: String,
    /// Texture for the last generated plot
    pub plot_texture: Option<egui::TextureHandle>,
    /// Whether to show the About dialog
    pub show_about_dialog: bool,
    /// Settings changed that only take effect after a restart
    pub restart_required: bool,
}

impl UiState {
    pub fn new(theme: Theme) -> Self {
        Self {
            current_theme: theme,
            active_tab: Tab::default(),
            theme_dirty: true, // Apply theme on first frame
            status_message: "Ready".to_string(),
            plot_texture: None,
            show_about_dialog: false,
            restart_required: false,
        }
    }
}
