//! Markup to plain text
//!
//! Articles arrive as HTML fragments from the content API. Narration needs
//! the readable text only: scripts, styles and comments are dropped, tags
//! are removed, character references are decoded and whitespace collapsed.

use log::trace;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("static pattern"));

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("static pattern"));

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static pattern"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static pattern"));

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z][a-zA-Z0-9]{1,31});")
        .expect("static pattern")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Named character references that show up in article bodies
static NAMED_ENTITIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("amp", "&");
    m.insert("lt", "<");
    m.insert("gt", ">");
    m.insert("quot", "\"");
    m.insert("apos", "'");
    m.insert("nbsp", " ");
    m.insert("ndash", "\u{2013}");
    m.insert("mdash", "\u{2014}");
    m.insert("hellip", "\u{2026}");
    m.insert("lsquo", "\u{2018}");
    m.insert("rsquo", "\u{2019}");
    m.insert("ldquo", "\u{201c}");
    m.insert("rdquo", "\u{201d}");
    m.insert("copy", "\u{a9}");
    m.insert("reg", "\u{ae}");
    m.insert("trade", "\u{2122}");
    m
});

/// Extract speakable plain text from marked-up content
///
/// Tags are replaced with a space so adjacent block elements
/// (`<p>one</p><p>two</p>`) never fuse into a single word.
pub fn extract_text(markup: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(markup, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = WHITESPACE.replace_all(&text, " ");

    let result = text.trim().to_string();
    trace!("Extracted {} chars of text from {} chars of markup", result.len(), markup.len());
    result
}

/// Decode HTML character references in a single pass
///
/// Unknown names are left as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                NAMED_ENTITIES.get(body).map(|s| s.to_string())
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
