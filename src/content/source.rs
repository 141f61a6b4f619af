//! Narration source derived from article content

use super::markup::extract_text;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default narration pace: 150 words per minute
pub const DEFAULT_WORDS_PER_SECOND: f64 = 2.5;

/// Identity of a piece of content, used to detect when it changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId(u64);

impl ContentId {
    /// Identity of raw markup
    pub fn of(markup: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        markup.hash(&mut hasher);
        ContentId(hasher.finish())
    }
}

/// Plain text ready for narration plus its estimated length
///
/// The engine offers no seek, so positions are expressed as word offsets:
/// a position of `t` seconds starts narration at word `floor(t * wps)`.
#[derive(Debug, Clone)]
pub struct NarrationSource {
    id: ContentId,
    text: String,
    words: Vec<String>,
    words_per_second: f64,
    total_duration: f64,
}

impl NarrationSource {
    /// Build a source from marked-up content
    pub fn from_markup(markup: &str, words_per_second: f64) -> Self {
        let text = extract_text(markup);
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let words_per_second = if words_per_second > 0.0 {
            words_per_second
        } else {
            DEFAULT_WORDS_PER_SECOND
        };
        let total_duration = (words.len() as f64 / words_per_second).ceil();

        debug!(
            "Narration source: {} words, ~{}s at {} words/s",
            words.len(),
            total_duration,
            words_per_second
        );

        Self {
            id: ContentId::of(markup),
            text,
            words,
            words_per_second,
            total_duration,
        }
    }

    /// Source with nothing to say
    pub fn empty() -> Self {
        Self::from_markup("", DEFAULT_WORDS_PER_SECOND)
    }

    pub fn id(&self) -> ContentId {
        self.id
    }

    /// Plain text with markup removed
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn words_per_second(&self) -> f64 {
        self.words_per_second
    }

    /// Estimated total narration time in whole seconds
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of words already covered at `seconds` into the narration
    pub fn word_offset(&self, seconds: f64) -> usize {
        if seconds <= 0.0 {
            return 0;
        }
        ((seconds * self.words_per_second).floor() as usize).min(self.words.len())
    }

    /// Text still to be spoken when starting at `seconds`
    ///
    /// Returns `None` when no words remain.
    pub fn remaining_text(&self, seconds: f64) -> Option<String> {
        let skip = self.word_offset(seconds);
        if skip >= self.words.len() {
            return None;
        }
        Some(self.words[skip..].join(" "))
    }
}

impl Default for NarrationSource {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_duration_estimate() {
        let source = NarrationSource::from_markup(&format!("<p>{}</p>", words(300)), 2.5);
        assert_eq!(source.word_count(), 300);
        assert_eq!(source.total_duration(), 120.0);
    }

    #[test]
    fn test_duration_rounds_up() {
        let source = NarrationSource::from_markup("one two three", 2.5);
        assert_eq!(source.total_duration(), 2.0);
    }

    #[test]
    fn test_empty_source() {
        let source = NarrationSource::from_markup("<div> </div>", 2.5);
        assert!(source.is_empty());
        assert_eq!(source.total_duration(), 0.0);
        assert_eq!(source.remaining_text(0.0), None);
    }

    #[test]
    fn test_word_offset() {
        let source = NarrationSource::from_markup(&words(300), 2.5);
        assert_eq!(source.word_offset(0.0), 0);
        assert_eq!(source.word_offset(-3.0), 0);
        assert_eq!(source.word_offset(30.0), 75);
        assert_eq!(source.word_offset(1.3), 3);
        assert_eq!(source.word_offset(500.0), 300);
    }

    #[test]
    fn test_remaining_text_starts_at_offset() {
        let source = NarrationSource::from_markup(&words(300), 2.5);
        let rest = source.remaining_text(30.0).unwrap();
        assert!(rest.starts_with("w75 w76"));
        assert!(rest.ends_with("w299"));
        assert_eq!(source.remaining_text(120.0), None);
    }

    #[test]
    fn test_identity_follows_markup() {
        let a = NarrationSource::from_markup("<p>same</p>", 2.5);
        let b = NarrationSource::from_markup("<p>same</p>", 2.5);
        let c = NarrationSource::from_markup("<p>other</p>", 2.5);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_invalid_pace_falls_back() {
        let source = NarrationSource::from_markup(&words(5), 0.0);
        assert_eq!(source.words_per_second(), DEFAULT_WORDS_PER_SECOND);
        assert_eq!(source.total_duration(), 2.0);
    }
}
