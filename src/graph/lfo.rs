use serde::{Deserialize, Serialize};

use crate::{
    dsp::oscillator::OscillatorBlock,
    graph::node::{GraphNode, RenderCtx},
};

/*
LFO (Low Frequency Oscillator)
==============================

A sine oscillator at sub-audio rate whose output is an absolute frequency in
Hz, not a bipolar -1..+1 signal. It swings around a center frequency:

    out = center + excursion · sin(2π · rate · t)

and the voice's audio oscillator reads that track as its pitch, one value
per sample. That is vibrato at low rates and FM sidebands once the rate
approaches audio range.

Depth is expressed as a percentage of a reference span:

    excursion = reference_span · depth_percent / 100

Each voice uses twice its own fundamental as the reference span, so 100%
depth at A4 (440 Hz) swings 880 Hz either side of center and vibrato depth
sounds the same on every key.

  Vibrato:    2 - 7 Hz, depth well under 1%
  Wobble:     0.5 - 2 Hz, a few percent
  Sirens:     slow rate, tens of percent
*/

/// Modulation settings copied into each voice at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationParams {
    /// LFO rate in Hz.
    pub rate: f32,
    /// Swing as a percentage of the reference span, in [0, 100].
    pub depth_percent: f32,
}

impl Default for ModulationParams {
    fn default() -> Self {
        Self {
            rate: 5.0,
            depth_percent: 0.1,
        }
    }
}

impl ModulationParams {
    /// Frequency excursion in Hz around `center`.
    pub fn excursion(&self, center: f32) -> f32 {
        reference_span(center) * self.depth_percent.clamp(0.0, 100.0) / 100.0
    }
}

/// Span that 100% modulation depth covers, either side of `center`.
///
/// Older front panels used a fixed 880 Hz span for every note. This one
/// scales with the note and gives that same 880 Hz only at A4.
pub fn reference_span(center: f32) -> f32 {
    2.0 * center
}

pub struct LfoNode {
    osc: OscillatorBlock,
    rate: f32,
    center: f32,
    excursion: f32,
}

impl LfoNode {
    /// Sine LFO swinging around `center` Hz.
    pub fn centered(params: ModulationParams, center: f32) -> Self {
        Self {
            osc: OscillatorBlock::sine(),
            rate: params.rate.max(0.0),
            center,
            excursion: params.excursion(center),
        }
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    pub fn excursion(&self) -> f32 {
        self.excursion
    }

    pub fn min(&self) -> f32 {
        self.center - self.excursion
    }

    pub fn max(&self) -> f32 {
        self.center + self.excursion
    }
}

impl GraphNode for LfoNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        // The LFO runs at its own rate, independent of the note pitch.
        self.osc.render(out, self.rate, ctx.sample_rate);
        for sample in out.iter_mut() {
            *sample = self.center + self.excursion * *sample;
        }
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.osc.reset();
    }
}
