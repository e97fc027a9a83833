use serde::{Deserialize, Serialize};

use crate::MIN_TIME;

/*
ADSR Envelope Implementation
============================

Linear attack/decay/sustain/release envelope generator, the amplitude shape
applied to every voice.

Vocabulary
----------

  level       The envelope's current output value (0.0 to 1.0). This multiplies
              the audio signal to control its amplitude over time.

  stage       Which phase of the envelope we're in: Idle, Attack, Decay,
              Sustain, or Release.

  gate        The note on/off signal. Gate high (note_on) triggers Attack.
              Gate low (note_off) triggers Release from wherever we are.


The Shape: Linear Ramps
-----------------------

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

The per-sample increment comes from the stage duration:

    increment = target_change / (time_seconds * sample_rate)

Release snapshots the starting level and total samples at note_off time and
interpolates linearly, so it always lands exactly on 0.0 after
`release * sample_rate` samples. The voice engine relies on that bound when
it schedules disposal `release` seconds (plus a guard) after note-off.
*/

/// Envelope shape copied into each voice at creation.
///
/// `attack`, `decay` and `release` are seconds; `sustain` is a level in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.01,
            sustain: 1.0,
            release: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,    // Gate low, envelope inactive, level = 0
    Attack,  // Gate just went high, ramping up to 1.0
    Decay,   // Reached peak, ramping down to sustain level
    Sustain, // Holding at sustain level while gate is high
    Release, // Gate went low, ramping down to 0
}

pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    stage: EnvelopeStage,
    level: f32,

    decay_start_level: f32,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn new(params: EnvelopeParams) -> Self {
        Self {
            attack_time: params.attack.max(MIN_TIME),
            decay_time: params.decay.max(MIN_TIME),
            sustain_level: params.sustain.clamp(0.0, 1.0),
            release_time: params.release.max(MIN_TIME),

            stage: EnvelopeStage::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    /// Gate high: restart the attack from zero.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: start the release phase from the current level.
    pub fn note_off(&mut self, sample_rate: f32) {
        if matches!(self.stage, EnvelopeStage::Idle | EnvelopeStage::Release) {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance the envelope by one sample.
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                self.level += 1.0 / (self.attack_time * sample_rate);

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }

            EnvelopeStage::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                self.level -= total_drop / (self.decay_time * sample_rate);

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeStage::Sustain;
                }
            }

            EnvelopeStage::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeStage::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(sample_rate);
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeStage::Idle)
    }

    /// Release duration in seconds, as stored at construction.
    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render_samples(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample(SAMPLE_RATE);
        }
    }

    fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Envelope {
        Envelope::new(EnvelopeParams {
            attack,
            decay,
            sustain,
            release,
        })
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = adsr(0.01, 0.1, 0.7, 0.2);

        env.note_on();
        render_samples(&mut env, (0.01 * SAMPLE_RATE) as usize + 1);

        assert!(env.level() > 0.99, "expected attack to reach full level");
        assert_ne!(env.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn sustain_holds_target_level() {
        let sustain = 0.6;
        let mut env = adsr(0.01, 0.05, sustain, 0.2);

        env.note_on();
        render_samples(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - sustain).abs() < 0.05, "sustain level should be held");
    }

    #[test]
    fn release_falls_back_to_idle() {
        let release = 0.03;
        let mut env = adsr(0.01, 0.05, 0.5, release);

        env.note_on();
        render_samples(&mut env, (0.02 * SAMPLE_RATE) as usize);

        env.note_off(SAMPLE_RATE);
        render_samples(&mut env, (release * SAMPLE_RATE) as usize + 2);

        assert!(env.level() <= 0.001, "release should fall back to zero");
        assert!(!env.is_active());
    }

    #[test]
    fn second_note_off_does_not_restart_release() {
        let mut env = adsr(0.01, 0.01, 1.0, 0.1);
        env.note_on();
        render_samples(&mut env, 30);

        env.note_off(SAMPLE_RATE);
        render_samples(&mut env, 50);
        let mid_release = env.level();

        env.note_off(SAMPLE_RATE);
        env.next_sample(SAMPLE_RATE);
        assert!(env.level() <= mid_release);
    }

    #[test]
    fn note_off_while_idle_is_ignored() {
        let mut env = adsr(0.01, 0.01, 1.0, 0.1);
        env.note_off(SAMPLE_RATE);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }
}
