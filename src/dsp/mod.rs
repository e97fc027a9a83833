//! Low-level DSP primitives used by the higher level graph nodes.
//!
//! These components are allocation-free and realtime-safe, making them safe to
//! embed directly inside a voice's signal chain. They stay focused on the
//! signal-processing math; the graph layer adds note events and wiring.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Decibel conversions.
pub mod gain;
/// Phase-accumulator oscillator and waveform shapes.
pub mod oscillator;

pub use envelope::{EnvelopeParams, EnvelopeStage};
pub use oscillator::Waveform;
