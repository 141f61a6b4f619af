//! Narration primitive abstraction
//!
//! A narrator turns one block of text into one utterance and reports its
//! lifecycle asynchronously. It cannot seek: to start somewhere else the
//! caller cancels and speaks a new utterance. Lifecycle signals are sent
//! through a channel because platform engines fire them from their own
//! threads; whoever owns the receiver decides when to act on them.

use crate::platform::is_wsl;
use crate::{NarrateError, Result};
use log::info;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

/// Language used when none is configured
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Handle of one synthesis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

/// Everything needed to synthesize one utterance
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    /// Text to speak
    pub text: String,

    /// BCP 47 language tag (e.g. "en-US")
    pub language: String,

    /// Speech rate (0-100, where 50 is normal)
    pub rate: Option<u8>,

    /// Pitch (0-100, where 50 is normal)
    pub pitch: Option<u8>,

    /// Output volume (0.0-1.0)
    pub volume: f32,
}

impl UtteranceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            rate: None,
            pitch: None,
            volume: 1.0,
        }
    }
}

/// Why an utterance did not finish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// Cut short because newer speech replaced it
    Interrupted,
    /// Cut short by an explicit cancel
    Canceled,
    /// Engine-side failure
    Failed(String),
}

impl SpeechErrorKind {
    /// Interruptions are the expected result of our own cancels
    pub fn is_benign(&self) -> bool {
        matches!(self, SpeechErrorKind::Interrupted | SpeechErrorKind::Canceled)
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechErrorKind::Interrupted => write!(f, "interrupted"),
            SpeechErrorKind::Canceled => write!(f, "canceled"),
            SpeechErrorKind::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// Lifecycle signal of an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarratorEventKind {
    Started,
    Ended,
    Error(SpeechErrorKind),
}

/// Lifecycle signal tagged with the utterance it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarratorEvent {
    pub utterance: UtteranceId,
    pub kind: NarratorEventKind,
}

impl NarratorEvent {
    pub fn started(utterance: UtteranceId) -> Self {
        Self { utterance, kind: NarratorEventKind::Started }
    }

    pub fn ended(utterance: UtteranceId) -> Self {
        Self { utterance, kind: NarratorEventKind::Ended }
    }

    pub fn error(utterance: UtteranceId, kind: SpeechErrorKind) -> Self {
        Self { utterance, kind: NarratorEventKind::Error(kind) }
    }
}

/// What a narrator can do beyond speak and cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarratorFeatures {
    /// Pause and resume keep the utterance's own position
    pub pause_in_place: bool,

    /// Volume changes apply to the utterance already speaking
    pub live_volume: bool,

    /// Ended and error signals are delivered for every utterance; without
    /// them the end of speech is only known from the duration estimate
    pub lifecycle_events: bool,
}

impl Default for NarratorFeatures {
    fn default() -> Self {
        Self {
            pause_in_place: true,
            live_volume: true,
            lifecycle_events: true,
        }
    }
}

/// Narration primitive
///
/// Implementations speak at most what they were last asked to; starting a
/// new utterance after `cancel` is always allowed.
pub trait Narrator {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Optional capabilities of this backend
    fn features(&self) -> NarratorFeatures;

    /// Start speaking a new utterance
    fn speak(&mut self, request: &UtteranceRequest) -> Result<UtteranceId>;

    /// Stop and discard whatever is speaking
    fn cancel(&mut self) -> Result<()>;

    /// Suspend the current utterance in place
    fn pause(&mut self) -> Result<()>;

    /// Continue a suspended utterance
    fn resume(&mut self) -> Result<()>;

    /// Set output volume (0.0-1.0)
    fn set_volume(&mut self, volume: f32) -> Result<()>;
}

/// A narrator together with the channel its lifecycle signals arrive on
pub struct SpeechBackend {
    pub narrator: Box<dyn Narrator>,
    pub events: Receiver<NarratorEvent>,
}

impl SpeechBackend {
    /// Pair a narrator with its event channel
    pub fn new(narrator: Box<dyn Narrator>, events: Receiver<NarratorEvent>) -> Self {
        Self { narrator, events }
    }
}

/// Narrator for the current platform
///
/// Probes backends in order and returns the first that initializes:
///
/// **WSL:** espeak-ng (via WSLg PulseAudio), then the native engine.
///
/// **Native Linux:** Speech Dispatcher through the `tts` crate, then espeak-ng.
///
/// **macOS / Windows:** the native engine through the `tts` crate.
///
/// Fails with [`NarrateError::CapabilityUnavailable`] when nothing can speak.
pub fn create_backend() -> Result<SpeechBackend> {
    let platform = std::env::consts::OS;
    let (tx, rx) = mpsc::channel();

    let attempts: Vec<(&str, BackendFactory)> = if platform == "linux" && is_wsl() {
        info!("Detected WSL environment");
        vec![
            ("espeak-ng", boxed_espeak as BackendFactory),
            ("native", boxed_native as BackendFactory),
        ]
    } else if platform == "linux" {
        info!("Detected native Linux environment");
        vec![
            ("native", boxed_native as BackendFactory),
            ("espeak-ng", boxed_espeak as BackendFactory),
        ]
    } else {
        info!("Creating native narrator for platform: {}", platform);
        vec![("native", boxed_native as BackendFactory)]
    };

    for (label, make) in attempts {
        info!("Trying {} backend...", label);
        match make(tx.clone()) {
            Ok(narrator) => {
                info!("✓ Initialized {} backend", narrator.name());
                return Ok(SpeechBackend::new(narrator, rx));
            }
            Err(e) => info!("✗ {} backend unavailable: {}", label, e),
        }
    }

    Err(NarrateError::CapabilityUnavailable)
}

type BackendFactory = fn(Sender<NarratorEvent>) -> Result<Box<dyn Narrator>>;

fn boxed_espeak(tx: Sender<NarratorEvent>) -> Result<Box<dyn Narrator>> {
    Ok(Box::new(super::backends::espeak::EspeakNarrator::new(tx)?))
}

fn boxed_native(tx: Sender<NarratorEvent>) -> Result<Box<dyn Narrator>> {
    Ok(Box::new(super::backends::native::NativeNarrator::new(tx)?))
}

/// Map a 0-100 setting (50 = normal) onto an engine's own range
pub fn scale_setting(value: u8, min: f32, normal: f32, max: f32) -> f32 {
    let value = f32::from(value.min(100));
    if value <= 50.0 {
        min + (normal - min) * value / 50.0
    } else {
        normal + (max - normal) * (value - 50.0) / 50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_setting() {
        assert_eq!(scale_setting(0, 0.1, 1.0, 10.0), 0.1);
        assert_eq!(scale_setting(50, 0.1, 1.0, 10.0), 1.0);
        assert_eq!(scale_setting(100, 0.1, 1.0, 10.0), 10.0);
        assert_eq!(scale_setting(75, 0.0, 1.0, 3.0), 2.0);
        assert_eq!(scale_setting(200, 0.0, 1.0, 3.0), 3.0);
    }

    #[test]
    fn test_benign_error_kinds() {
        assert!(SpeechErrorKind::Interrupted.is_benign());
        assert!(SpeechErrorKind::Canceled.is_benign());
        assert!(!SpeechErrorKind::Failed("audio device lost".into()).is_benign());
    }

    #[test]
    fn test_request_defaults() {
        let request = UtteranceRequest::new("hello");
        assert_eq!(request.language, "en-US");
        assert_eq!(request.volume, 1.0);
        assert_eq!(request.rate, None);
    }

    #[test]
    fn test_event_constructors() {
        let id = UtteranceId(7);
        assert_eq!(NarratorEvent::started(id).kind, NarratorEventKind::Started);
        assert_eq!(NarratorEvent::ended(id).utterance, id);
        assert_eq!(id.to_string(), "utterance#7");
    }
}
