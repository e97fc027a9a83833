use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::io::note::NoteId;

/*
Computer Keyboard Layouts
=========================

The home row plays the white keys, the row above plays the black keys,
like a piano seen from above:

  Chromatic (one octave plus a major third, 17 keys):

     w e   t y u   o p
    a s d f g h j k l ;
    C D E F G A B C D E

  Diatonic (white keys only):

    a s d f g h j k l ;
    C D E F G A B C D E

`base_octave` chooses which octave `a` plays. Keys are matched case
insensitively so caps lock does not silence the keyboard.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    Diatonic,
    #[default]
    Chromatic,
}

/// (key, semitones above C of the base octave)
const CHROMATIC: [(char, u8); 17] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
    ('o', 13),
    ('l', 14),
    ('p', 15),
    (';', 16),
];

const DIATONIC: [(char, u8); 10] = [
    ('a', 0),
    ('s', 2),
    ('d', 4),
    ('f', 5),
    ('g', 7),
    ('h', 9),
    ('j', 11),
    ('k', 12),
    ('l', 14),
    (';', 16),
];

/// Static lookup from keyboard keys to notes, fixed at construction.
#[derive(Debug, Clone)]
pub struct NoteKeyMap {
    layout: KeyLayout,
    keys: Vec<(char, NoteId)>,
    by_key: HashMap<char, NoteId>,
}

impl NoteKeyMap {
    pub fn new(layout: KeyLayout, base_octave: i8) -> Self {
        let table: &[(char, u8)] = match layout {
            KeyLayout::Chromatic => &CHROMATIC,
            KeyLayout::Diatonic => &DIATONIC,
        };

        // Keys whose note would fall outside the MIDI range are left unmapped.
        let keys: Vec<(char, NoteId)> = table
            .iter()
            .filter_map(|&(key, semitone)| {
                NoteId::from_octave(base_octave, semitone).map(|note| (key, note))
            })
            .collect();
        let by_key = keys.iter().copied().collect();

        Self {
            layout,
            keys,
            by_key,
        }
    }

    pub fn chromatic(base_octave: i8) -> Self {
        Self::new(KeyLayout::Chromatic, base_octave)
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    pub fn lookup(&self, key: char) -> Option<NoteId> {
        self.by_key.get(&key.to_ascii_lowercase()).copied()
    }

    /// Reverse lookup, for highlighting the key that plays `note`.
    pub fn key_for(&self, note: NoteId) -> Option<char> {
        self.keys.iter().find(|(_, n)| *n == note).map(|(k, _)| *k)
    }

    /// Mapped keys in ascending pitch order.
    pub fn keys(&self) -> impl Iterator<Item = (char, NoteId)> + '_ {
        self.keys.iter().copied()
    }
}

/// Turns raw key events into note gates, dropping auto-repeat presses.
///
/// A key must be released before it can start another note.
#[derive(Debug, Clone)]
pub struct KeyGate {
    map: NoteKeyMap,
    held: HashMap<char, NoteId>,
}

impl KeyGate {
    pub fn new(map: NoteKeyMap) -> Self {
        Self {
            map,
            held: HashMap::new(),
        }
    }

    pub fn map(&self) -> &NoteKeyMap {
        &self.map
    }

    /// Returns the note to start, or `None` for unmapped keys and repeats.
    pub fn press(&mut self, key: char) -> Option<NoteId> {
        let key = key.to_ascii_lowercase();
        let note = self.map.lookup(key)?;
        if self.held.contains_key(&key) {
            return None;
        }
        self.held.insert(key, note);
        Some(note)
    }

    /// Returns the note to stop, or `None` if the key was not held.
    pub fn release(&mut self, key: char) -> Option<NoteId> {
        self.held.remove(&key.to_ascii_lowercase())
    }

    pub fn is_held(&self, key: char) -> bool {
        self.held.contains_key(&key.to_ascii_lowercase())
    }

    /// Release every held key, returning the notes that were gated on.
    pub fn release_all(&mut self) -> Vec<NoteId> {
        self.held.drain().map(|(_, note)| note).collect()
    }
}
