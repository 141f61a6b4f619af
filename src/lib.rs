//! Narrate - read-aloud playback for documents
//!
//! Narrates the text of a markup document through the platform speech
//! engine, with play, pause/resume, stop, skip and mute controls. Engines
//! only speak whole utterances, so seeking re-synthesizes from the word at
//! the target time and position is tracked from the wall clock.

pub mod config;
pub mod content;
pub mod error;
pub mod input;
pub mod platform;
pub mod playback;
pub mod speech;
pub mod terminal;

pub use error::{NarrateError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "narrate";
