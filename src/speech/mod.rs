//! Speech synthesis system

pub mod synth;
pub mod backends;

pub use synth::{
    create_backend, scale_setting, Narrator, NarratorEvent, NarratorEventKind, NarratorFeatures,
    SpeechBackend, SpeechErrorKind, UtteranceId, UtteranceRequest, DEFAULT_LANGUAGE,
};
