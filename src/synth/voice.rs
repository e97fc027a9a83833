use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::{io::note::NoteId, synth::params::ParamTemplate};

/// Identity of one voice instance. Ids are never reused within an engine, so
/// two voices for the same note are always distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) u64);

impl VoiceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Attacking,  // Envelope rising through attack and decay
    Sustaining, // Attack and decay finished, holding sustain
    Releasing,  // Release triggered, tail still audible
    Disposed,   // Disconnected from the mix bus
}

/// Control-thread record of one sounding note.
///
/// The audio side owns the matching `SignalChain`; this keeps the copied
/// parameters and the lifecycle used to decide when the chain can go.
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    note: NoteId,
    params: ParamTemplate,
    state: VoiceState,
    created_at: Instant,
    released_at: Option<Instant>,
}

impl Voice {
    pub(crate) fn new(id: VoiceId, note: NoteId, params: ParamTemplate, now: Instant) -> Self {
        Self {
            id,
            note,
            params,
            state: VoiceState::Attacking,
            created_at: now,
            released_at: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn note(&self) -> NoteId {
        self.note
    }

    /// The template snapshot taken when this voice was created.
    pub fn params(&self) -> &ParamTemplate {
        &self.params
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn released_at(&self) -> Option<Instant> {
        self.released_at
    }

    /// Release duration from this voice's own envelope copy.
    pub fn release_time(&self) -> Duration {
        seconds(self.params.envelope.release)
    }

    /// How long after release the chain must stay connected.
    pub fn disposal_delay(&self, guard: Duration) -> Duration {
        self.release_time().saturating_add(guard)
    }

    /// Move `Attacking → Sustaining` once attack and decay have elapsed.
    pub(crate) fn advance(&mut self, now: Instant) {
        if self.state != VoiceState::Attacking {
            return;
        }
        let env = self.params.envelope;
        let rise = seconds(env.attack).saturating_add(seconds(env.decay));
        if now.saturating_duration_since(self.created_at) >= rise {
            self.state = VoiceState::Sustaining;
        }
    }

    pub(crate) fn begin_release(&mut self, now: Instant) {
        debug_assert!(matches!(
            self.state,
            VoiceState::Attacking | VoiceState::Sustaining
        ));
        self.state = VoiceState::Releasing;
        self.released_at = Some(now);
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.state = VoiceState::Disposed;
    }
}

/// Seconds to a `Duration`, saturating at `Duration::MAX`. Negative and NaN
/// values count as zero.
fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0) as f64).unwrap_or(Duration::MAX)
}
