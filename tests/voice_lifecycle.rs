use std::time::{Duration, Instant};

use polytone::{
    analysis::analyser,
    dsp::EnvelopeParams,
    io::{KeyGate, NoteId, NoteKeyMap},
    synth::{mix_bus, MixBus, ParamTemplate, VoiceEngine, VoiceState},
};

const SR: f32 = 48_000.0;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn note(name: &str) -> NoteId {
    name.parse().unwrap()
}

fn setup() -> (VoiceEngine, MixBus) {
    let (writer, _tap) = analyser(1024, 128, 0.8);
    let (bus, handle) = mix_bus(SR, writer);
    (VoiceEngine::new(handle, ParamTemplate::default()), bus)
}

#[test]
fn press_and_release_disposes_once() {
    let (mut engine, mut bus) = setup();
    let t0 = Instant::now();
    let c4 = note("C4");

    let id = engine.note_on(c4, t0);
    let voice = engine.voice(c4).unwrap();
    assert_eq!(voice.note(), c4);
    assert_eq!(voice.state(), VoiceState::Attacking);
    bus.render(&mut vec![0.0; 512]);

    // Default release is 0.01 s, so disposal is due about 110 ms later.
    let released = t0 + ms(50);
    assert!(engine.note_off(c4, released));
    assert!(engine.voice(c4).is_none());
    assert!(engine.is_pending(id));

    assert!(engine.poll(released + ms(105)).is_empty());
    assert_eq!(engine.poll(released + ms(115)), vec![id]);
    assert!(engine.poll(released + ms(500)).is_empty());

    bus.render(&mut vec![0.0; 512]);
    assert_eq!(bus.connected(), 0);
    assert!(!engine.is_sounding(c4));
    assert_eq!(engine.stats().created, 1);
    assert_eq!(engine.stats().disposed, 1);
}

#[test]
fn retrigger_keeps_the_new_voice() {
    let (mut engine, mut bus) = setup();
    let t0 = Instant::now();
    let c4 = note("C4");

    let first = engine.note_on(c4, t0);
    let second = engine.note_on(c4, t0 + ms(5));
    bus.render(&mut vec![0.0; 256]);
    assert_eq!(bus.connected(), 2);

    // Only the stolen voice goes away when its delay elapses.
    assert_eq!(engine.poll(t0 + ms(5 + 115)), vec![first]);
    let current = engine.voice(c4).unwrap();
    assert_eq!(current.id(), second);
    assert_ne!(current.state(), VoiceState::Disposed);

    bus.render(&mut vec![0.0; 256]);
    assert!(bus.is_connected(second));
    assert!(!bus.is_connected(first));

    assert!(engine.poll(t0 + Duration::from_secs(5)).is_empty());
    assert_eq!(engine.voice(c4).map(|v| v.id()), Some(second));
}

#[test]
fn released_retrigger_can_finish_before_the_stolen_voice() {
    let (mut engine, mut bus) = setup();
    let t0 = Instant::now();
    let c4 = note("C4");

    let mut template = ParamTemplate::default();
    template.envelope.release = 0.5;
    engine.set_template(template);
    let first = engine.note_on(c4, t0);

    template.envelope.release = 0.05;
    engine.set_template(template);
    // Stolen at 5 ms, due at about 605 ms.
    let second = engine.note_on(c4, t0 + ms(5));
    // Released at 10 ms, due at about 160 ms.
    assert!(engine.note_off(c4, t0 + ms(10)));
    assert!(!engine.is_sounding(c4));
    bus.render(&mut vec![0.0; 256]);
    assert_eq!(bus.connected(), 2);

    assert_eq!(engine.poll(t0 + ms(200)), vec![second]);
    assert!(engine.is_pending(first));
    assert!(!engine.is_sounding(c4));
    bus.render(&mut vec![0.0; 256]);
    assert!(bus.is_connected(first));
    assert!(!bus.is_connected(second));

    assert_eq!(engine.poll(t0 + ms(700)), vec![first]);
    assert!(engine.poll(t0 + Duration::from_secs(5)).is_empty());
    bus.render(&mut vec![0.0; 256]);
    assert_eq!(bus.connected(), 0);
    assert_eq!(engine.stats().disposed, 2);
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn release_without_press_changes_nothing() {
    let (mut engine, _bus) = setup();
    let t0 = Instant::now();

    assert!(!engine.note_off(note("G4"), t0));
    assert_eq!(engine.active_count(), 0);
    assert_eq!(engine.pending_count(), 0);
    assert!(engine.poll(t0 + Duration::from_secs(1)).is_empty());
}

#[test]
fn later_template_edits_only_reach_new_voices() {
    let (mut engine, _bus) = setup();
    let t0 = Instant::now();
    let c4 = note("C4");

    engine.note_on(c4, t0);
    engine.set_envelope(EnvelopeParams {
        attack: 0.5,
        decay: 0.3,
        sustain: 0.4,
        release: 1.2,
    });
    engine.set_volume_db(-30.0);

    let old = engine.voice(c4).unwrap().params();
    assert_eq!(old.envelope, EnvelopeParams::default());
    assert_eq!(old.volume_db, -10.0);

    engine.note_on(c4, t0 + ms(10));
    let new = engine.voice(c4).unwrap().params();
    assert_eq!(new.envelope.release, 1.2);
    assert_eq!(new.volume_db, -30.0);
}

#[test]
fn chords_release_independently() {
    let (mut engine, _bus) = setup();
    let t0 = Instant::now();
    let chord = [note("C4"), note("E4"), note("G4")];

    for &n in &chord {
        engine.note_on(n, t0);
    }
    assert_eq!(engine.active_count(), 3);

    engine.note_off(chord[1], t0 + ms(20));
    assert!(engine.is_sounding(chord[0]));
    assert!(!engine.is_sounding(chord[1]));
    assert!(engine.is_sounding(chord[2]));

    assert_eq!(engine.poll(t0 + ms(200)).len(), 1);
    assert_eq!(engine.active_count(), 2);
}

#[test]
fn shutdown_clears_active_and_pending() {
    let (mut engine, mut bus) = setup();
    let t0 = Instant::now();
    engine.note_on(note("C4"), t0);
    engine.note_on(note("C4"), t0);
    engine.note_on(note("A4"), t0);
    engine.note_off(note("A4"), t0);
    bus.render(&mut vec![0.0; 128]);

    assert_eq!(engine.shutdown(), 3);
    bus.render(&mut vec![0.0; 128]);
    assert_eq!(bus.connected(), 0);

    // Timers that would have fired later are gone.
    assert!(engine.poll(t0 + Duration::from_secs(3)).is_empty());
}

#[test]
fn key_gate_filters_repeats_before_the_engine() {
    let (mut engine, _bus) = setup();
    let mut gate = KeyGate::new(NoteKeyMap::chromatic(4));
    let t0 = Instant::now();

    let mut started = 0;
    for key in ['a', 'a', 'A', 'q'] {
        if let Some(n) = gate.press(key) {
            engine.note_on(n, t0);
            started += 1;
        }
    }
    assert_eq!(started, 1);
    assert_eq!(engine.stats().stolen, 0);

    let released = gate.release('a').unwrap();
    assert!(engine.note_off(released, t0 + ms(30)));
}
