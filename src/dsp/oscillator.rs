use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/*
Phase-Accumulator Oscillator
============================

Every waveform here is a function of a single normalized phase in [0, 1).
Each sample we read the waveform at the current phase, then advance:

    phase += frequency / sample_rate
    phase -= floor(phase)

Because the increment is computed per sample, the frequency can change on
every sample. That is what lets a modulation oscillator drive pitch at audio
rate without any parameter smoothing.

  Sine      sin(2π · phase)
  Square    +1 for the first half cycle, -1 for the second
  Sawtooth  rising ramp from -1 to +1
  Triangle  -1 → +1 → -1 over one cycle

The shapes are naive (not band-limited). Above a few kHz the square and saw
alias audibly, which is acceptable for a monitoring synth.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }

    /// Evaluate the waveform at a normalized phase in [0, 1).
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let value = self.waveform.at(self.phase);
        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();
        value
    }

    /// Fill `out` at a constant frequency.
    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate);
        }
    }

    /// Fill `out` following a per-sample frequency track (Hz).
    pub fn render_tracking(&mut self, out: &mut [f32], frequencies: &[f32], sample_rate: f32) {
        for (sample, &freq) in out.iter_mut().zip(frequencies) {
            *sample = self.next_sample(freq, sample_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shape_stays_bipolar() {
        for waveform in Waveform::ALL {
            let mut osc = OscillatorBlock::new(waveform);
            let mut buffer = vec![0.0f32; 2048];
            osc.render(&mut buffer, 997.0, 48_000.0);
            assert!(
                buffer.iter().all(|s| (-1.0..=1.0).contains(s)),
                "{} left [-1, 1]",
                waveform.label()
            );
        }
    }

    #[test]
    fn square_flips_at_half_cycle() {
        assert_eq!(Waveform::Square.at(0.25), 1.0);
        assert_eq!(Waveform::Square.at(0.75), -1.0);
    }

    #[test]
    fn triangle_peaks_mid_cycle() {
        assert_eq!(Waveform::Triangle.at(0.5), 1.0);
        assert_eq!(Waveform::Triangle.at(0.0), -1.0);
    }

    #[test]
    fn tracking_follows_frequency_changes() {
        // Zero frequency freezes the phase, so output stays at sin(0).
        let mut osc = OscillatorBlock::sine();
        let mut buffer = [1.0f32; 16];
        osc.render_tracking(&mut buffer, &[0.0; 16], 48_000.0);
        assert!(buffer.iter().all(|s| s.abs() < 1e-6));
    }
}
