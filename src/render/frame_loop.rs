use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{
    analysis::AnalyserTap,
    render::{
        plot::{plot_spectrum, plot_waveform, PlotOutcome, SkipReason},
        surface::DrawSurface,
    },
};

/// Roughly one display refresh.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The loop is not running.
    Inactive,
    /// Running, but the next frame is not due yet.
    NotDue,
    /// A frame ran. Either plot may have been skipped.
    Frame {
        waveform: PlotOutcome,
        spectrum: PlotOutcome,
    },
}

impl FrameOutcome {
    pub fn drew_anything(self) -> bool {
        match self {
            FrameOutcome::Frame { waveform, spectrum } => waveform.is_drawn() || spectrum.is_drawn(),
            _ => false,
        }
    }
}

/// Frame-driven consumer of the analyser tap.
///
/// Instead of a callback that reschedules itself, the loop holds one armed
/// deadline. The host calls [`poll`](RenderLoop::poll) from its event loop;
/// when the deadline has passed a frame is drawn and the next one armed.
/// [`stop`](RenderLoop::stop) disarms it, so no draw happens afterwards.
///
/// Missing taps, surfaces or buffers skip that frame's plot and are retried
/// on the next frame.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    state: LoopState,
    interval: Duration,
    next_due: Option<Instant>,
    frames: u64,
}

impl RenderLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: LoopState::Idle,
            interval,
            next_due: None,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deadline of the armed frame, `None` unless running.
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Frames run since construction, skipped plots included.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Start (or restart) the loop. The first frame is due immediately.
    /// Does nothing while already running.
    pub fn start(&mut self, now: Instant) {
        if self.state == LoopState::Running {
            return;
        }
        debug!(from = ?self.state, "render loop start");
        self.state = LoopState::Running;
        self.next_due = Some(now);
    }

    /// Cancel the armed frame. Idempotent.
    pub fn stop(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        debug!(frames = self.frames, "render loop stop");
        self.state = LoopState::Stopped;
        self.next_due = None;
    }

    pub fn poll(
        &mut self,
        now: Instant,
        tap: Option<&AnalyserTap>,
        waveform_surface: Option<&mut dyn DrawSurface>,
        spectrum_surface: Option<&mut dyn DrawSurface>,
    ) -> FrameOutcome {
        let due = match (self.state, self.next_due) {
            (LoopState::Running, Some(due)) => due,
            _ => return FrameOutcome::Inactive,
        };
        if now < due {
            return FrameOutcome::NotDue;
        }

        let waveform = draw(waveform_surface, tap.and_then(AnalyserTap::waveform), plot_waveform);
        let spectrum = draw(spectrum_surface, tap.and_then(AnalyserTap::spectrum), plot_spectrum);
        if !(waveform.is_drawn() && spectrum.is_drawn()) {
            trace!(?waveform, ?spectrum, "frame partially skipped");
        }

        self.frames += 1;
        self.next_due = Some(now + self.interval);
        FrameOutcome::Frame { waveform, spectrum }
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

fn draw(
    surface: Option<&mut dyn DrawSurface>,
    buffer: Option<&[f32]>,
    plot: fn(&mut dyn DrawSurface, &[f32]) -> PlotOutcome,
) -> PlotOutcome {
    match (surface, buffer) {
        (None, _) => PlotOutcome::Skipped(SkipReason::NoSurface),
        (Some(_), None) => PlotOutcome::Skipped(SkipReason::NoData),
        (Some(surface), Some(buffer)) => plot(surface, buffer),
    }
}
