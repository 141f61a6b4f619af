//! Key bindings for the narration player

pub mod keymap;

pub use keymap::{create_default_keymap, parse_keys, KeyAction, KeySequence};
