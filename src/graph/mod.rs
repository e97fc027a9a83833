//! Block-rendering nodes that make up one voice's signal chain.
//!
//! Graph nodes wrap the low-level DSP primitives with the pieces a voice
//! needs: note events, modulated frequency and block-based rendering.

/// Envelope generator node exposing ADSR state.
pub mod envelope;
/// Fixed output gain, set in decibels.
pub mod gain;
/// Frequency modulator centred on the note's fundamental.
pub mod lfo;
/// Core traits shared by all graph nodes.
pub mod node;
/// Audio-band oscillator with per-sample frequency input.
pub mod oscillator;
