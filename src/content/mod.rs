//! Article content prepared for narration

pub mod markup;
pub mod source;

pub use markup::extract_text;
pub use source::{ContentId, NarrationSource, DEFAULT_WORDS_PER_SECOND};
