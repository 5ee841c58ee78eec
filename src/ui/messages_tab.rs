//! Messages tab UI rendering

use eframe::egui::{self, RichText};

use crate::app::PlotdoApp;
use crate::lifecycle::RequestState;
use crate::ui::components::{render_request_status, section};

/// Render the messages tab
pub fn render_messages_tab(app: &mut PlotdoApp, ui: &mut egui::Ui) {
    let theme = app.ui.current_theme.clone();

    section(&theme, ui, "Backend Status", |ui| {
        match app.messages.status.state() {
            RequestState::Succeeded(message) => {
                ui.horizontal(|ui| {
                    ui.colored_label(theme.success, "●");
                    ui.label(RichText::new(message).color(theme.text_primary));
                });
            }
            RequestState::Idle => {
                ui.label(RichText::new("Not checked yet").color(theme.text_muted));
            }
            _ => render_request_status(&theme, ui, &app.messages.status, "Checking..."),
        }

        ui.add_space(8.0);
        let check = egui::Button::new("Check Again");
        if ui.add_enabled(!app.messages.status.is_pending(), check).clicked() {
            let event = app.messages.spawn_check_status();
            app.handle_events(ui.ctx(), event);
        }
    });

    ui.add_space(12.0);

    section(&theme, ui, "Echo", |ui| {
        let enabled = !app.messages.echo.is_pending();

        ui.horizontal(|ui| {
            let input = ui.add_enabled(
                enabled,
                egui::TextEdit::singleline(&mut app.messages.echo_input)
                    .hint_text("Say something")
                    .desired_width(320.0),
            );
            let submitted = input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            if ui.add_enabled(enabled, egui::Button::new("Send")).clicked() || submitted {
                let event = app.messages.spawn_echo();
                app.handle_events(ui.ctx(), event);
            }

            let has_outcome = !matches!(app.messages.echo.state(), RequestState::Idle);
            if ui.add_enabled(enabled && has_outcome, egui::Button::new("Clear")).clicked() {
                app.messages.echo.reset();
                app.messages.echo_input.clear();
            }
        });

        ui.add_space(8.0);
        render_request_status(&theme, ui, &app.messages.echo, "Sending...");

        if let Some(reply) = app.messages.echo.state().payload() {
            egui::Grid::new("echo_reply_grid")
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Reply:").color(theme.text_muted));
                    ui.label(RichText::new(&reply.message).color(theme.text_primary));
                    ui.end_row();

                    ui.label(RichText::new("You sent:").color(theme.text_muted));
                    ui.label(RichText::new(&reply.original_message).color(theme.text_secondary));
                    ui.end_row();
                });
        }
    });
}
