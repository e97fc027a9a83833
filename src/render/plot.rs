use crate::render::surface::DrawSurface;

/// Added to a decibel magnitude to get a bar height in surface units.
pub const SPECTRUM_OFFSET_DB: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No surface to draw on, or it has no area.
    NoSurface,
    /// The tap has not produced this buffer yet.
    NoData,
    /// Buffer was empty or held non-finite values.
    InvalidData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotOutcome {
    Drawn,
    Skipped(SkipReason),
}

impl PlotOutcome {
    pub fn is_drawn(self) -> bool {
        self == PlotOutcome::Drawn
    }
}

/// Vertical position of a sample: +1 at the top, -1 at the bottom.
pub fn waveform_y(sample: f32, height: f32) -> f32 {
    (0.5 - sample.clamp(-1.0, 1.0) * 0.5) * height
}

pub fn spectrum_bar_height(magnitude_db: f32, height: f32) -> f32 {
    (magnitude_db + SPECTRUM_OFFSET_DB).clamp(0.0, height.max(0.0))
}

pub fn waveform_points(samples: &[f32], width: f32, height: f32) -> Vec<(f32, f32)> {
    let step = width / samples.len().max(1) as f32;
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f32 * step, waveform_y(s, height)))
        .collect()
}

fn usable(buffer: &[f32]) -> bool {
    !buffer.is_empty() && buffer.iter().all(|v| v.is_finite())
}

fn has_area(surface: &dyn DrawSurface) -> bool {
    surface.width() > 0.0 && surface.height() > 0.0
}

/// Clear `surface` and draw `samples` as one connected line.
pub fn plot_waveform(surface: &mut dyn DrawSurface, samples: &[f32]) -> PlotOutcome {
    if !has_area(surface) {
        return PlotOutcome::Skipped(SkipReason::NoSurface);
    }
    if !usable(samples) {
        return PlotOutcome::Skipped(SkipReason::InvalidData);
    }

    let points = waveform_points(samples, surface.width(), surface.height());
    surface.clear();
    surface.stroke_polyline(&points);
    PlotOutcome::Drawn
}

/// Clear `surface` and draw one bottom-anchored bar per bin, left to right.
pub fn plot_spectrum(surface: &mut dyn DrawSurface, magnitudes: &[f32]) -> PlotOutcome {
    if !has_area(surface) {
        return PlotOutcome::Skipped(SkipReason::NoSurface);
    }
    if !usable(magnitudes) {
        return PlotOutcome::Skipped(SkipReason::InvalidData);
    }

    let (width, height) = (surface.width(), surface.height());
    let bar_width = width / magnitudes.len() as f32;
    surface.clear();
    for (i, &db) in magnitudes.iter().enumerate() {
        let bar = spectrum_bar_height(db, height);
        surface.fill_rect(i as f32 * bar_width, height - bar, bar_width, bar);
    }
    PlotOutcome::Drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::RecordedSurface;

    #[test]
    fn waveform_y_maps_full_scale_to_edges() {
        assert_eq!(waveform_y(1.0, 150.0), 0.0);
        assert_eq!(waveform_y(-1.0, 150.0), 150.0);
        assert_eq!(waveform_y(0.0, 150.0), 75.0);
        // Out of range samples stay on the surface.
        assert_eq!(waveform_y(4.0, 150.0), 0.0);
    }

    #[test]
    fn bar_height_offsets_and_clamps() {
        assert_eq!(spectrum_bar_height(-100.0, 150.0), 50.0);
        assert_eq!(spectrum_bar_height(-200.0, 150.0), 0.0);
        assert_eq!(spectrum_bar_height(10.0, 150.0), 150.0);
    }

    #[test]
    fn waveform_spans_width_left_to_right() {
        let mut surface = RecordedSurface::new(100.0, 50.0);
        assert!(plot_waveform(&mut surface, &[0.0, 0.5, -0.5, 1.0]).is_drawn());

        let line: Vec<_> = surface.polylines().next().unwrap().to_vec();
        assert_eq!(line, vec![(0.0, 25.0), (25.0, 12.5), (50.0, 37.5), (75.0, 0.0)]);
    }

    #[test]
    fn spectrum_bars_sit_on_the_bottom_edge() {
        let mut surface = RecordedSurface::new(40.0, 100.0);
        plot_spectrum(&mut surface, &[-120.0, -200.0, -60.0, 0.0]);

        let bars: Vec<_> = surface.rects().collect();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0], (0.0, 70.0, 10.0, 30.0));
        assert_eq!(bars[1], (10.0, 100.0, 10.0, 0.0));
        assert_eq!(bars[3], (30.0, 0.0, 10.0, 100.0));
        for (_, y, _, h) in bars {
            assert_eq!(y + h, 100.0);
        }
    }

    #[test]
    fn bad_input_leaves_surface_untouched() {
        let mut surface = RecordedSurface::new(10.0, 10.0);
        assert_eq!(
            plot_waveform(&mut surface, &[]),
            PlotOutcome::Skipped(SkipReason::InvalidData)
        );
        assert_eq!(
            plot_spectrum(&mut surface, &[0.0, f32::NAN]),
            PlotOutcome::Skipped(SkipReason::InvalidData)
        );
        assert!(surface.ops().is_empty());

        let mut flat = RecordedSurface::new(10.0, 0.0);
        assert_eq!(
            plot_waveform(&mut flat, &[0.0]),
            PlotOutcome::Skipped(SkipReason::NoSurface)
        );
    }
}
