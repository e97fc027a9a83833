use serde::{Deserialize, Serialize};

use crate::{
    dsp::{envelope::EnvelopeParams, oscillator::Waveform},
    graph::lfo::ModulationParams,
};

/// Everything a new voice copies when it is created.
///
/// The engine takes this by value on every note-on, so the four categories are
/// always read together and later edits never reach a voice already sounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamTemplate {
    pub waveform: Waveform,
    pub envelope: EnvelopeParams,
    pub modulation: ModulationParams,
    pub volume_db: f32,
}

impl Default for ParamTemplate {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            envelope: EnvelopeParams::default(),
            modulation: ModulationParams::default(),
            volume_db: -10.0,
        }
    }
}

/// The continuous controls a front end can adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Volume,
    Attack,
    Decay,
    Sustain,
    Release,
    ModRate,
    ModDepth,
}

impl ParamKind {
    pub const ALL: [ParamKind; 7] = [
        ParamKind::Volume,
        ParamKind::Attack,
        ParamKind::Decay,
        ParamKind::Sustain,
        ParamKind::Release,
        ParamKind::ModRate,
        ParamKind::ModDepth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ParamKind::Volume => "volume",
            ParamKind::Attack => "attack",
            ParamKind::Decay => "decay",
            ParamKind::Sustain => "sustain",
            ParamKind::Release => "release",
            ParamKind::ModRate => "mod rate",
            ParamKind::ModDepth => "mod depth",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            ParamKind::Volume => "dB",
            ParamKind::Attack | ParamKind::Decay | ParamKind::Release => "s",
            ParamKind::Sustain => "",
            ParamKind::ModRate => "Hz",
            ParamKind::ModDepth => "%",
        }
    }

    /// Inclusive (min, max).
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamKind::Volume => (-60.0, 0.0),
            ParamKind::Attack | ParamKind::Decay | ParamKind::Release => (0.01, 2.0),
            ParamKind::Sustain => (0.0, 1.0),
            ParamKind::ModRate => (0.1, 10.0),
            ParamKind::ModDepth => (0.0, 100.0),
        }
    }

    pub fn step(self) -> f32 {
        match self {
            ParamKind::Volume | ParamKind::ModDepth => 1.0,
            ParamKind::Attack | ParamKind::Decay | ParamKind::Release | ParamKind::Sustain => 0.01,
            ParamKind::ModRate => 0.1,
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.range();
        // NaN would pass straight through `clamp`.
        if value.is_nan() {
            return min;
        }
        value.clamp(min, max)
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl ParamTemplate {
    pub fn get(&self, kind: ParamKind) -> f32 {
        match kind {
            ParamKind::Volume => self.volume_db,
            ParamKind::Attack => self.envelope.attack,
            ParamKind::Decay => self.envelope.decay,
            ParamKind::Sustain => self.envelope.sustain,
            ParamKind::Release => self.envelope.release,
            ParamKind::ModRate => self.modulation.rate,
            ParamKind::ModDepth => self.modulation.depth_percent,
        }
    }

    /// Set a control, clamped to its range.
    pub fn set(&mut self, kind: ParamKind, value: f32) {
        let value = kind.clamp(value);
        let slot = match kind {
            ParamKind::Volume => &mut self.volume_db,
            ParamKind::Attack => &mut self.envelope.attack,
            ParamKind::Decay => &mut self.envelope.decay,
            ParamKind::Sustain => &mut self.envelope.sustain,
            ParamKind::Release => &mut self.envelope.release,
            ParamKind::ModRate => &mut self.modulation.rate,
            ParamKind::ModDepth => &mut self.modulation.depth_percent,
        };
        *slot = value;
    }

    /// Move a control by whole steps, snapping to the step grid.
    pub fn nudge(&mut self, kind: ParamKind, steps: i32) {
        let step = kind.step();
        let current = (self.get(kind) / step).round();
        self.set(kind, (current + steps as f32) * step);
    }

    /// Copy with every control pulled back into range.
    pub fn clamped(mut self) -> Self {
        for kind in ParamKind::ALL {
            self.set(kind, self.get(kind));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_front_panel() {
        let t = ParamTemplate::default();
        assert_eq!(t.volume_db, -10.0);
        assert_eq!(t.envelope.sustain, 1.0);
        assert_eq!(t.modulation.rate, 5.0);
        assert_eq!(t, t.clamped());
    }

    #[test]
    fn set_clamps_to_range() {
        let mut t = ParamTemplate::default();
        t.set(ParamKind::Sustain, 4.0);
        assert_eq!(t.envelope.sustain, 1.0);
        t.set(ParamKind::Release, 0.0);
        assert_eq!(t.envelope.release, 0.01);
        t.set(ParamKind::Volume, -90.0);
        assert_eq!(t.volume_db, -60.0);
    }

    #[test]
    fn nudge_moves_by_steps() {
        let mut t = ParamTemplate::default();
        t.nudge(ParamKind::Volume, 3);
        assert_eq!(t.volume_db, -7.0);
        t.nudge(ParamKind::Release, 9);
        assert!((t.envelope.release - 0.10).abs() < 1e-5);
        t.nudge(ParamKind::ModDepth, -5);
        assert_eq!(t.modulation.depth_percent, 0.0);
    }

    #[test]
    fn kinds_cycle_both_ways() {
        for kind in ParamKind::ALL {
            assert_eq!(kind.next().prev(), kind);
        }
        assert_eq!(ParamKind::ModDepth.next(), ParamKind::Volume);
    }
}
