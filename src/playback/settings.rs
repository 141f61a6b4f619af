//! Tunable playback parameters

use crate::content::DEFAULT_WORDS_PER_SECOND;
use crate::speech::DEFAULT_LANGUAGE;
use std::time::Duration;

/// Settings the controller applies to every utterance and transition
///
/// The three delays work around engines whose cancel takes effect
/// asynchronously. They are tuning values, not correctness guarantees:
/// events from a replaced utterance are discarded by id regardless.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// Narration pace used for duration estimates and word offsets
    pub words_per_second: f64,

    /// Jump size for skip forward / skip back
    pub skip_seconds: f64,

    /// Sampler period
    pub tick: Duration,

    /// Wait between cancelling live speech and starting new speech in `play`
    pub restart_settle: Duration,

    /// Wait between cancelling and restarting after a seek
    pub seek_settle: Duration,

    /// Wait after a post-seek start before pausing again
    pub repause_delay: Duration,

    /// Language tag for utterances
    pub language: String,

    /// Speech rate (0-100, 50 is normal)
    pub rate: Option<u8>,

    /// Pitch (0-100, 50 is normal)
    pub pitch: Option<u8>,

    /// Unmuted output volume (0.0-1.0)
    pub volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            words_per_second: DEFAULT_WORDS_PER_SECOND,
            skip_seconds: 15.0,
            tick: Duration::from_millis(100),
            restart_settle: Duration::from_millis(50),
            seek_settle: Duration::from_millis(200),
            repause_delay: Duration::from_millis(100),
            language: DEFAULT_LANGUAGE.to_string(),
            rate: None,
            pitch: None,
            volume: 1.0,
        }
    }
}
