//! Error types for narrate

use std::io;
use thiserror::Error;

/// Main error type for narrate
///
/// The playback controller never returns these to its caller; it folds them
/// into state transitions. Backends, configuration and the front end
/// propagate them with `?`.
#[derive(Error, Debug)]
pub enum NarrateError {
    /// No text-to-speech engine exists in this runtime
    #[error("Narration is not available on this system")]
    CapabilityUnavailable,

    /// Markup produced no speakable text
    #[error("Content has no speakable text")]
    EmptyContent,

    /// Speech was cut short by our own cancel
    #[error("Speech was interrupted")]
    SynthesisInterrupted,

    /// Engine failure unrelated to cancellation
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl NarrateError {
    /// True for errors that only exist because we cancelled speech ourselves
    pub fn is_benign(&self) -> bool {
        matches!(self, NarrateError::SynthesisInterrupted)
    }
}

/// Result type alias for narrate operations
pub type Result<T> = std::result::Result<T, NarrateError>;

impl From<String> for NarrateError {
    fn from(s: String) -> Self {
        NarrateError::Other(s)
    }
}

impl From<&str> for NarrateError {
    fn from(s: &str) -> Self {
        NarrateError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_interruption_is_benign() {
        assert!(NarrateError::SynthesisInterrupted.is_benign());
        assert!(!NarrateError::SynthesisFailed("boom".into()).is_benign());
        assert!(!NarrateError::EmptyContent.is_benign());
    }

    #[test]
    fn test_string_conversion() {
        let err: NarrateError = "something broke".into();
        assert_eq!(err.to_string(), "something broke");
    }
}
