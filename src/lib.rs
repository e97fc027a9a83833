pub mod analysis; // Waveform and spectrum taps on the mix bus
pub mod config;
pub mod dsp;
pub mod graph; // Per-voice signal nodes
pub mod io; // Notes and computer-keyboard mapping
pub mod render; // Frame loop and plot drawing
pub mod synth; // Voice lifecycle and polyphony

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
