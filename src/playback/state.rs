//! Playback state and the snapshot published to renderers

use crate::Result;
use serde::Serialize;
use std::fmt;

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Error,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Ended => "ended",
            PlaybackStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Controller-owned playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub status: PlaybackStatus,

    /// Position in seconds, always within `0..=total_duration`
    pub elapsed_seconds: f64,

    /// Estimated length of the loaded content
    pub total_duration: f64,

    /// Survives stop, restart and content changes
    pub is_muted: bool,

    /// Message for the last surfaced failure while in `Error`
    pub error: Option<String>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            elapsed_seconds: 0.0,
            total_duration: 0.0,
            is_muted: false,
            error: None,
        }
    }

    /// Set position, clamped into the valid range
    pub fn set_elapsed(&mut self, seconds: f64) {
        self.elapsed_seconds = seconds.clamp(0.0, self.total_duration.max(0.0));
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status,
            is_playing: matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused),
            is_paused: self.status == PlaybackStatus::Paused,
            is_loading: self.status == PlaybackStatus::Loading,
            elapsed_seconds: self.elapsed_seconds,
            total_duration: self.total_duration,
            is_muted: self.is_muted,
            error: self.error.clone(),
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// What a renderer needs to draw the player
///
/// `is_playing` stays true while paused: it means a narration session is
/// active, and `is_paused` tells the two apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_loading: bool,
    pub elapsed_seconds: f64,
    pub total_duration: f64,
    pub is_muted: bool,
    pub error: Option<String>,
}

impl PlaybackSnapshot {
    /// Fraction of the content already narrated (0.0-1.0)
    pub fn progress(&self) -> f64 {
        super::format::progress(self.elapsed_seconds, self.total_duration)
    }

    /// One-line JSON for machine-readable renderers
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
