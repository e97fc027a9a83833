use std::{fmt, str::FromStr};

/*
Note Identifiers
================

A note is stored as its MIDI number, so it is `Copy`, hashes cheaply and
orders by pitch. It displays and parses as a scientific-pitch name:

    C4   = MIDI 60 (middle C)
    A4   = MIDI 69 = 440 Hz
    C#4  = Db4 = Cs4 = MIDI 61

The MIDI formula: note_number = 12 * (octave + 1) + semitone
Where semitone: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9, A#=10, B=11
*/

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNoteError {
    Empty,
    /// Unknown pitch letter
    Letter(String),
    /// Octave missing or not a number
    Octave(String),
    /// Parsed, but outside MIDI 0..=127
    OutOfRange(String),
}

impl fmt::Display for ParseNoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNoteError::Empty => write!(f, "empty note name"),
            ParseNoteError::Letter(name) => write!(f, "unknown pitch letter in {:?}", name),
            ParseNoteError::Octave(name) => write!(f, "bad octave in {:?}", name),
            ParseNoteError::OutOfRange(name) => write!(f, "{:?} is outside the MIDI range", name),
        }
    }
}

impl std::error::Error for ParseNoteError {}

impl NoteId {
    pub const A4: NoteId = NoteId(69);
    pub const C4: NoteId = NoteId(60);

    /// Returns `None` above MIDI 127.
    pub fn from_midi(number: u8) -> Option<Self> {
        (number <= 127).then_some(Self(number))
    }

    /// Build from an octave and a semitone offset (0 = C). Offsets of 12 or
    /// more carry into the next octave.
    pub fn from_octave(octave: i8, semitone: u8) -> Option<Self> {
        let number = 12 * (octave as i32 + 1) + semitone as i32;
        u8::try_from(number).ok().and_then(Self::from_midi)
    }

    pub fn midi(self) -> u8 {
        self.0
    }

    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    pub fn pitch_class(self) -> &'static str {
        NAMES[(self.0 % 12) as usize]
    }

    pub fn is_sharp(self) -> bool {
        self.pitch_class().ends_with('#')
    }

    /// Fundamental frequency, equal temperament with A4 = 440 Hz.
    pub fn frequency(self) -> f32 {
        440.0 * 2.0_f32.powf((self.0 as f32 - 69.0) / 12.0)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave())
    }
}

impl FromStr for NoteId {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars().peekable();
        let letter = chars.next().ok_or(ParseNoteError::Empty)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(ParseNoteError::Letter(s.to_owned())),
        };

        let accidental = match chars.peek() {
            Some('#') | Some('s') => 1,
            Some('b') => -1,
            _ => 0,
        };
        if accidental != 0 {
            chars.next();
        }

        let octave: i32 = chars
            .collect::<String>()
            .parse()
            .map_err(|_| ParseNoteError::Octave(s.to_owned()))?;

        let number = 12 * (octave + 1) + base + accidental;
        u8::try_from(number)
            .ok()
            .and_then(NoteId::from_midi)
            .ok_or_else(|| ParseNoteError::OutOfRange(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c_is_60() {
        assert_eq!("C4".parse::<NoteId>().unwrap().midi(), 60);
    }

    #[test]
    fn a440() {
        let a4: NoteId = "A4".parse().unwrap();
        assert_eq!(a4, NoteId::A4);
        assert!((a4.frequency() - 440.0).abs() < 1e-3);
    }

    #[test]
    fn sharps_and_flats_are_equal() {
        let sharp: NoteId = "C#4".parse().unwrap();
        let flat: NoteId = "Db4".parse().unwrap();
        let ascii_sharp: NoteId = "Cs4".parse().unwrap();
        assert_eq!(sharp, flat);
        assert_eq!(sharp, ascii_sharp);
    }

    #[test]
    fn display_round_trips_names() {
        for name in ["C4", "F#3", "B-1", "G9"] {
            let note: NoteId = name.parse().unwrap();
            assert_eq!(note.to_string(), name);
        }
    }

    #[test]
    fn octaves_double_frequency() {
        let a4 = NoteId::A4.frequency();
        let a5 = NoteId::from_octave(5, 9).unwrap().frequency();
        assert!((a5 - 2.0 * a4).abs() < 1e-2);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<NoteId>(), Err(ParseNoteError::Empty));
        assert!(matches!("H4".parse::<NoteId>(), Err(ParseNoteError::Letter(_))));
        assert!(matches!("C".parse::<NoteId>(), Err(ParseNoteError::Octave(_))));
        assert!(matches!("G10".parse::<NoteId>(), Err(ParseNoteError::OutOfRange(_))));
    }
}
