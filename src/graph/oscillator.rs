use crate::dsp::oscillator::{OscillatorBlock, Waveform};
use crate::graph::node::{GraphNode, RenderCtx};

/*
Audio Oscillator
================

The sound source of every voice. The waveform is fixed when the voice is
built; the pitch either follows the note (`render_block`) or a per-sample
frequency track written by a modulation oscillator (`render_modulated`).

Waveform Character
------------------

  Sine      Fundamental only. Smooth, hollow, flute-like.
  Square    Odd harmonics at 1/n. Hollow, woody, clarinet-like.
  Sawtooth  All harmonics at 1/n. Bright, buzzy, brassy.
  Triangle  Odd harmonics at 1/n². Soft, between sine and square.

Frequency input is clamped to the audible range (20 Hz - 20 kHz) so a deep
modulation swing can never drive the phase increment negative.
*/

pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20_000.0;

pub struct OscNode {
    osc: OscillatorBlock,
}

impl OscNode {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            osc: OscillatorBlock::new(waveform),
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.osc.waveform()
    }

    /// Render following `frequencies` (Hz per sample) instead of the note pitch.
    ///
    /// Both slices must be the same length.
    pub fn render_modulated(&mut self, out: &mut [f32], frequencies: &mut [f32], ctx: &RenderCtx) {
        debug_assert_eq!(out.len(), frequencies.len());
        for freq in frequencies.iter_mut() {
            *freq = freq.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        }
        self.osc.render_tracking(out, frequencies, ctx.sample_rate);
    }
}

impl GraphNode for OscNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let freq = ctx.frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        self.osc.render(out, freq, ctx.sample_rate);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.osc.reset();
    }
}
