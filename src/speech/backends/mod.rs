//! Platform-specific narration backends

// Native TTS backend using the tts crate (cross-platform)
pub mod native;

// espeak-ng child processes, used on WSL and as the Linux fallback
pub mod espeak;
