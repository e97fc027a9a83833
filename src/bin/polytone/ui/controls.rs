//! Status bar, parameter list and keyboard row

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use polytone::synth::ParamKind;

use super::TEAL;
use crate::app::App;

pub fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" polytone ").borders(Borders::ALL);
    let template = app.engine.template();

    let gate = if app.key_releases { "key release" } else { "timed gate" };
    let line = Line::from(vec![
        Span::styled(
            format!(" {}  ", template.waveform.label()),
            Style::default().fg(TEAL).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("voices {}  releasing {}  ", app.engine.active_count(), app.engine.pending_count()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("{:.1}kHz  {}  ", app.sample_rate / 1000.0, gate),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn render_params(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Params ").borders(Borders::ALL);
    let template = app.engine.template();

    let lines: Vec<Line> = ParamKind::ALL
        .iter()
        .map(|&kind| {
            let selected = kind == app.selected;
            let style = if selected {
                Style::default().fg(Color::Black).bg(TEAL)
            } else {
                Style::default().fg(Color::White)
            };
            let marker = if selected { ">" } else { " " };
            Line::from(Span::styled(
                format!("{marker} {:<8} {:>7.2} {}", kind.label(), template.get(kind), kind.unit()),
                style,
            ))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// One cell per mapped key, lit while its note has an active voice.
pub fn render_keyboard(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Keys ").borders(Borders::ALL);

    let mut spans = Vec::new();
    for (key, note) in app.gate.map().keys() {
        let style = match (app.engine.is_sounding(note), note.is_sharp()) {
            (true, _) => Style::default().fg(Color::Black).bg(TEAL),
            (false, true) => Style::default().fg(Color::Gray).bg(Color::Black),
            (false, false) => Style::default().fg(Color::Black).bg(Color::White),
        };
        spans.push(Span::styled(format!(" {} {:<3}", key.to_ascii_uppercase(), note.to_string()), style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
