//! Narrated playback
//!
//! The controller owns the playback state machine; the other modules are
//! the pieces it is assembled from.

pub mod clock;
pub mod controller;
pub mod format;
pub mod scheduler;
pub mod settings;
pub mod state;

pub use controller::{Capability, NarrationController};
pub use format::{format_clock, progress, status_line};
pub use settings::PlaybackSettings;
pub use state::{PlaybackSnapshot, PlaybackState, PlaybackStatus};
