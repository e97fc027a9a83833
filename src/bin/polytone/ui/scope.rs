//! Replays a recorded surface onto a ratatui canvas

use ratatui::{
    layout::Rect,
    symbols,
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders,
    },
    Frame,
};

use polytone::render::{DrawOp, DrawSurface, RecordedSurface};

use super::TEAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeStyle {
    Line,
    Bars,
}

/// Draw `surface` into `area`. Surface y grows downward, canvas y upward.
pub fn render_scope(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    surface: &RecordedSurface,
    style: ScopeStyle,
) {
    let width = surface.width() as f64;
    let height = surface.height() as f64;
    let flip = |y: f32| height - y as f64;

    let marker = match style {
        ScopeStyle::Line => symbols::Marker::Braille,
        ScopeStyle::Bars => symbols::Marker::HalfBlock,
    };

    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(marker)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for op in surface.ops() {
                match op {
                    DrawOp::Clear => {}
                    DrawOp::Polyline(points) => {
                        for pair in points.windows(2) {
                            let (x1, y1) = pair[0];
                            let (x2, y2) = pair[1];
                            ctx.draw(&CanvasLine::new(x1 as f64, flip(y1), x2 as f64, flip(y2), TEAL));
                        }
                    }
                    // Filled bar: one vertical stroke through its centre.
                    &DrawOp::Rect { x, y, width: w, height: h } => {
                        if h <= 0.0 {
                            continue;
                        }
                        let cx = (x + w * 0.5) as f64;
                        ctx.draw(&CanvasLine::new(cx, flip(y + h), cx, flip(y), TEAL));
                    }
                }
            }
        });

    frame.render_widget(canvas, area);
}
