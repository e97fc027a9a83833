use std::fmt;

use crate::synth::{chain::SignalChain, voice::VoiceId};

/// Graph edits sent from the control thread to the mix bus.
pub enum BusCommand {
    /// Add a started chain to the mix.
    Connect(Box<SignalChain>),
    /// Trigger the release tail of a connected chain.
    Release(VoiceId),
    /// Remove a chain from the mix and hand it back for deallocation.
    Disconnect(VoiceId),
}

impl fmt::Debug for BusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusCommand::Connect(chain) => f.debug_tuple("Connect").field(&chain.id()).finish(),
            BusCommand::Release(id) => f.debug_tuple("Release").field(id).finish(),
            BusCommand::Disconnect(id) => f.debug_tuple("Disconnect").field(id).finish(),
        }
    }
}
