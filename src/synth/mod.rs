// Purpose: Voice lifecycle, parameter templates and the shared mix bus.
// This layer sits above graph nodes and decides which voices exist.

pub mod bus;
pub mod chain;
pub mod engine;
pub mod message;
pub mod params;
pub mod voice;

pub use bus::{mix_bus, BusHandle, MixBus};
pub use engine::{EngineStats, VoiceEngine};
pub use params::{ParamKind, ParamTemplate};
pub use voice::{Voice, VoiceId, VoiceState};
