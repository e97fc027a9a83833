use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap},
    time::{Duration, Instant},
};

use tracing::{debug, error, trace};

use crate::{
    dsp::{envelope::EnvelopeParams, oscillator::Waveform},
    graph::lfo::ModulationParams,
    io::note::NoteId,
    synth::{
        bus::BusHandle,
        chain::SignalChain,
        message::BusCommand,
        params::ParamTemplate,
        voice::{Voice, VoiceId, VoiceState},
    },
};

/*
Voice Engine
============

Runs on the control thread and decides which voices exist. For each note
there is at most one *active* voice, the one `note_off` will release. A
voice leaves the active map in two ways:

  note_off(n)       the player let go of the key
  note_on(n) again  the key was struck while its last voice still sounded
                    (voice stealing)

Either way the voice is *detached*: its release tail is triggered and it is
moved into the pending-disposal heap, which becomes its only owner. When
`release + guard` has passed, `poll` disconnects its chain from the mix bus
and drops the record.

    note_on(C4)   active[C4] = v1
    note_on(C4)   v1 → pending (due t + r₁ + guard), active[C4] = v2
    note_off(C4)  v2 → pending (due t' + r₂ + guard), active[C4] empty
    poll(...)     v1 disposed, later v2 disposed

The delay always comes from the voice's own release time, captured when it
was created, never from whatever the template says now.

Identity is a `VoiceId` that is never reused, so a disposal can always tell
its target apart from a newer voice on the same key.
*/

/// Extra time a released voice stays connected after its envelope reaches zero.
pub const DEFAULT_DISPOSAL_GUARD: Duration = Duration::from_millis(100);

/// Stand-in deadline offset when `now + delay` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub created: u64,
    pub stolen: u64,
    pub released: u64,
    pub disposed: u64,
}

/// A detached voice waiting for its tail to finish.
struct PendingDisposal {
    due: Instant,
    voice: Voice,
}

impl PendingDisposal {
    fn key(&self) -> (Instant, VoiceId) {
        (self.due, self.voice.id())
    }
}

impl PartialEq for PendingDisposal {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PendingDisposal {}

impl PartialOrd for PendingDisposal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingDisposal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

pub struct VoiceEngine {
    bus: BusHandle,
    template: ParamTemplate,
    active: HashMap<NoteId, Voice>,
    pending: BinaryHeap<Reverse<PendingDisposal>>,
    guard: Duration,
    next_id: u64,
    stats: EngineStats,
}

impl VoiceEngine {
    pub fn new(bus: BusHandle, template: ParamTemplate) -> Self {
        Self {
            bus,
            template: template.clamped(),
            active: HashMap::new(),
            pending: BinaryHeap::new(),
            guard: DEFAULT_DISPOSAL_GUARD,
            next_id: 1,
            stats: EngineStats::default(),
        }
    }

    pub fn with_disposal_guard(mut self, guard: Duration) -> Self {
        self.guard = guard;
        self
    }

    // --- parameter template ---

    pub fn template(&self) -> &ParamTemplate {
        &self.template
    }

    /// Replace the template used by future voices. Voices already created
    /// keep their own copy. Values are clamped to their control ranges.
    pub fn set_template(&mut self, template: ParamTemplate) {
        self.template = template.clamped();
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.template.waveform = waveform;
    }

    pub fn set_envelope(&mut self, envelope: EnvelopeParams) {
        self.set_template(ParamTemplate {
            envelope,
            ..self.template
        });
    }

    pub fn set_modulation(&mut self, modulation: ModulationParams) {
        self.set_template(ParamTemplate {
            modulation,
            ..self.template
        });
    }

    pub fn set_volume_db(&mut self, volume_db: f32) {
        self.set_template(ParamTemplate {
            volume_db,
            ..self.template
        });
    }

    // --- note events ---

    /// Start a new voice for `note`, stealing the previous one if it is
    /// still active. Returns the new voice's id.
    ///
    /// Key-repeat filtering is the caller's job: every call starts a voice.
    pub fn note_on(&mut self, note: NoteId, now: Instant) -> VoiceId {
        if let Some(previous) = self.active.remove(&note) {
            debug!(%note, stolen = %previous.id(), "voice steal");
            self.stats.stolen += 1;
            self.detach(previous, now);
        }

        // One copy of the whole template, so no voice sees a half-updated set.
        let snapshot = self.template;
        let id = VoiceId(self.next_id);
        self.next_id += 1;

        let mut chain = SignalChain::new(id, note, &snapshot, self.bus.sample_rate());
        chain.start();
        self.bus.send(BusCommand::Connect(Box::new(chain)));

        debug!(%note, voice = %id, waveform = snapshot.waveform.label(), "note on");
        self.stats.created += 1;
        let replaced = self.active.insert(note, Voice::new(id, note, snapshot, now));
        debug_assert!(replaced.is_none(), "two active voices for {note}");
        id
    }

    /// Release the active voice for `note`. Returns `false` (and does
    /// nothing) when no voice is active for it.
    pub fn note_off(&mut self, note: NoteId, now: Instant) -> bool {
        match self.active.remove(&note) {
            Some(voice) => {
                debug!(%note, voice = %voice.id(), "note off");
                self.detach(voice, now);
                true
            }
            None => {
                trace!(%note, "note off with no active voice");
                false
            }
        }
    }

    /// Trigger the release tail and hand the voice to its disposal timer.
    fn detach(&mut self, mut voice: Voice, now: Instant) {
        voice.begin_release(now);
        self.bus.send(BusCommand::Release(voice.id()));
        self.stats.released += 1;

        let due = deadline(now, voice.disposal_delay(self.guard));
        self.pending.push(Reverse(PendingDisposal { due, voice }));
    }

    // --- timers ---

    /// Run everything that is due at `now`: disposal timers, lifecycle
    /// transitions and bus housekeeping. Returns the voices disposed.
    pub fn poll(&mut self, now: Instant) -> Vec<VoiceId> {
        self.bus.flush();
        self.bus.collect_retired();

        for voice in self.active.values_mut() {
            voice.advance(now);
        }

        let mut disposed = Vec::new();
        while self.pending.peek().is_some_and(|Reverse(p)| p.due <= now) {
            if let Some(Reverse(entry)) = self.pending.pop() {
                if let Some(id) = self.dispose(entry.voice) {
                    disposed.push(id);
                }
            }
        }
        disposed
    }

    /// Disconnect a detached voice. A no-op for a voice already disposed.
    fn dispose(&mut self, mut voice: Voice) -> Option<VoiceId> {
        if voice.state() == VoiceState::Disposed {
            return None;
        }

        let still_active = self
            .active
            .get(&voice.note())
            .is_some_and(|current| current.id() == voice.id());
        if still_active {
            debug_assert!(false, "disposal scheduled for active voice {}", voice.id());
            error!(voice = %voice.id(), note = %voice.note(), "refusing to dispose an active voice");
            return None;
        }

        self.bus.send(BusCommand::Disconnect(voice.id()));
        voice.mark_disposed();
        self.stats.disposed += 1;
        trace!(voice = %voice.id(), note = %voice.note(), "disposed");
        Some(voice.id())
    }

    /// Earliest pending disposal, for hosts that sleep between polls.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.peek().map(|Reverse(p)| p.due)
    }

    /// Dispose every voice now, active and pending, skipping their timers.
    /// Returns how many were disposed. Safe to call more than once.
    pub fn shutdown(&mut self) -> usize {
        let mut count = 0;
        let active: Vec<Voice> = self.active.drain().map(|(_, voice)| voice).collect();
        for voice in active {
            if self.dispose(voice).is_some() {
                count += 1;
            }
        }
        while let Some(Reverse(entry)) = self.pending.pop() {
            if self.dispose(entry.voice).is_some() {
                count += 1;
            }
        }
        self.bus.flush();
        self.bus.collect_retired();

        if count > 0 {
            debug!(count, "engine shutdown");
        }
        count
    }

    // --- queries ---

    pub fn voice(&self, note: NoteId) -> Option<&Voice> {
        self.active.get(&note)
    }

    /// Whether `note` has an active voice, i.e. its key should be lit.
    pub fn is_sounding(&self, note: NoteId) -> bool {
        self.active.contains_key(&note)
    }

    pub fn active_notes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.active.keys().copied()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether voice `id` is still waiting for disposal.
    pub fn is_pending(&self, id: VoiceId) -> bool {
        self.pending.iter().any(|Reverse(p)| p.voice.id() == id)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn bus(&self) -> &BusHandle {
        &self.bus
    }
}

/// `now + delay`, saturating instead of overflowing the clock.
fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl Drop for VoiceEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::analyser, synth::bus::mix_bus, synth::bus::MixBus};

    const SR: f32 = 48_000.0;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn engine() -> (VoiceEngine, MixBus) {
        let (writer, _tap) = analyser(256, 16, 0.0);
        let (bus, handle) = mix_bus(SR, writer);
        (VoiceEngine::new(handle, ParamTemplate::default()), bus)
    }

    fn c4() -> NoteId {
        NoteId::C4
    }

    #[test]
    fn note_on_creates_attacking_voice() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        let id = engine.note_on(c4(), t0);

        let voice = engine.voice(c4()).expect("voice for C4");
        assert_eq!(voice.id(), id);
        assert_eq!(voice.state(), VoiceState::Attacking);
        assert!(engine.is_sounding(c4()));
    }

    #[test]
    fn note_off_without_voice_is_a_no_op() {
        let (mut engine, _bus) = engine();
        assert!(!engine.note_off(c4(), Instant::now()));
        assert_eq!(engine.stats(), EngineStats::default());
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn steal_detaches_previous_voice() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        let first = engine.note_on(c4(), t0);
        let second = engine.note_on(c4(), t0 + ms(5));

        assert_ne!(first, second);
        assert_eq!(engine.voice(c4()).map(Voice::id), Some(second));
        assert!(engine.is_pending(first));
        assert_eq!(engine.active_count(), 1);
        assert_eq!(engine.stats().stolen, 1);
    }

    #[test]
    fn disposal_waits_for_release_plus_guard() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        let mut params = ParamTemplate::default();
        params.envelope.release = 0.2;
        engine.set_template(params);

        let id = engine.note_on(c4(), t0);
        engine.note_off(c4(), t0 + ms(50));

        assert!(engine.poll(t0 + ms(50 + 290)).is_empty());
        assert_eq!(engine.poll(t0 + ms(50 + 310)), vec![id]);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn delay_uses_the_voice_copy_not_the_template() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        let id = engine.note_on(c4(), t0);

        // Slider moves after the voice started.
        let mut params = *engine.template();
        params.envelope.release = 2.0;
        engine.set_template(params);

        engine.note_off(c4(), t0);
        assert_eq!(engine.poll(t0 + ms(120)), vec![id]);
    }

    #[test]
    fn stealing_also_uses_the_voice_copy() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        let first = engine.note_on(c4(), t0);

        let mut params = *engine.template();
        params.envelope.release = 2.0;
        engine.set_template(params);

        let second = engine.note_on(c4(), t0);
        assert_eq!(engine.poll(t0 + ms(120)), vec![first]);
        assert_eq!(engine.voice(c4()).map(Voice::id), Some(second));
    }

    #[test]
    fn template_changes_do_not_touch_existing_voices() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        engine.note_on(c4(), t0);

        engine.set_envelope(EnvelopeParams {
            attack: 1.0,
            decay: 1.0,
            sustain: 0.2,
            release: 1.5,
        });
        engine.set_waveform(Waveform::Square);

        let voice = engine.voice(c4()).unwrap();
        assert_eq!(voice.params().envelope, EnvelopeParams::default());
        assert_eq!(voice.params().waveform, Waveform::Sine);

        let d4: NoteId = "D4".parse().unwrap();
        engine.note_on(d4, t0);
        assert_eq!(engine.voice(d4).unwrap().params().envelope.release, 1.5);
    }

    #[test]
    fn attacking_voice_moves_to_sustaining() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        engine.note_on(c4(), t0);
        engine.poll(t0 + ms(30));
        assert_eq!(engine.voice(c4()).map(Voice::state), Some(VoiceState::Sustaining));
    }

    #[test]
    fn chains_follow_voice_lifecycle() {
        let (mut engine, mut bus) = engine();
        let t0 = Instant::now();
        let id = engine.note_on(c4(), t0);
        bus.render(&mut [0.0; 64]);
        assert!(bus.is_connected(id));

        engine.note_off(c4(), t0);
        engine.poll(t0 + ms(200));
        bus.render(&mut [0.0; 64]);
        assert!(!bus.is_connected(id));
        assert_eq!(bus.connected(), 0);
    }

    #[test]
    fn shutdown_disposes_everything_once() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        engine.note_on(c4(), t0);
        engine.note_on(c4(), t0);
        engine.note_on("E4".parse().unwrap(), t0);

        assert_eq!(engine.shutdown(), 3);
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.pending_count(), 0);
        assert_eq!(engine.shutdown(), 0);
        assert!(engine.poll(t0 + Duration::from_secs(10)).is_empty());
        assert_eq!(engine.stats().disposed, 3);
    }

    #[test]
    fn deadlines_come_out_in_order() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        let mut params = *engine.template();

        params.envelope.release = 0.5;
        engine.set_template(params);
        let slow = engine.note_on(c4(), t0);

        params.envelope.release = 0.05;
        engine.set_template(params);
        let e4: NoteId = "E4".parse().unwrap();
        let fast = engine.note_on(e4, t0);

        engine.note_off(c4(), t0);
        engine.note_off(e4, t0);
        let first_due = engine.next_deadline().unwrap();
        assert!(first_due > t0 + ms(149) && first_due < t0 + ms(151));
        assert_eq!(engine.poll(t0 + ms(200)), vec![fast]);
        assert_eq!(engine.poll(t0 + ms(700)), vec![slow]);
    }

    #[test]
    fn out_of_range_template_values_are_clamped() {
        let (mut engine, _bus) = engine();
        let t0 = Instant::now();
        engine.set_envelope(EnvelopeParams {
            attack: 1e20,
            decay: f32::INFINITY,
            sustain: 0.5,
            release: 1e20,
        });
        engine.set_volume_db(f32::NAN);
        assert_eq!(engine.template().envelope.release, 2.0);
        assert_eq!(engine.template().volume_db, -60.0);

        let id = engine.note_on(c4(), t0);
        assert!(engine.poll(t0).is_empty());
        assert_eq!(engine.voice(c4()).map(Voice::state), Some(VoiceState::Attacking));

        engine.note_off(c4(), t0);
        assert!(engine.poll(t0 + ms(2050)).is_empty());
        assert_eq!(engine.poll(t0 + ms(2150)), vec![id]);
    }

    #[test]
    fn deadline_saturates() {
        let t0 = Instant::now();
        assert!(deadline(t0, Duration::MAX) > t0);
        assert_eq!(deadline(t0, ms(10)), t0 + ms(10));
    }
}
