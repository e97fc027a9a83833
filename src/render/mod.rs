//! Drawing the analyser snapshots onto a surface, one frame at a time.
//!
//! [`plot`] holds the pure coordinate math, [`surface`] abstracts the canvas
//! and [`frame_loop`] decides when a frame is drawn.

pub mod frame_loop;
pub mod plot;
pub mod surface;

pub use frame_loop::{FrameOutcome, LoopState, RenderLoop, DEFAULT_FRAME_INTERVAL};
pub use plot::{PlotOutcome, SkipReason};
pub use surface::{DrawOp, DrawSurface, RecordedSurface};
