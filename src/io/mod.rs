// Purpose - external interfaces: note naming and computer-keyboard input

pub mod keymap;
pub mod note;

pub use keymap::{KeyGate, KeyLayout, NoteKeyMap};
pub use note::{NoteId, ParseNoteError};
