//! TUI module for polytone
//!
//! Lays out the status bar, parameter list, keyboard row and both scopes.

mod controls;
mod scope;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use super::app::App;

use controls::{render_keyboard, render_params, render_status};
use scope::{render_scope, ScopeStyle};

/// Accent used for both scopes.
pub const TEAL: Color = Color::Rgb(0, 209, 178);

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Length(3), // Keyboard
            Constraint::Min(8),    // Params + scopes
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_status(frame, rows[0], app);
    render_keyboard(frame, rows[1], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(20)])
        .split(rows[2]);
    render_params(frame, body[0], app);

    let scopes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[1]);
    render_scope(frame, scopes[0], " Waveform ", &app.waveform, ScopeStyle::Line);
    render_scope(frame, scopes[1], " Spectrum ", &app.spectrum, ScopeStyle::Bars);

    let help = Paragraph::new(" [keys] Play  [1-4] Waveform  [Tab] Select  [←/→] Adjust  [Esc] Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[3]);
}
