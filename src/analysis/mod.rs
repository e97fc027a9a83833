//! Read points on the mix bus: a time-domain window and a magnitude spectrum.
//!
//! The audio thread writes through a [`TapWriter`]; the control thread owns
//! the [`AnalyserTap`] and reads snapshots from it.

pub mod spectrum;
pub mod tap;

pub use tap::{analyser, AnalyserTap, TapWriter};
