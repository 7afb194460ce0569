//! Text cleanup shared by the extractors and classifiers.
//!
//! Sentence splitting here is a length and noise control for scraped
//! descriptions, not linguistic segmentation.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static SENTENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.?!]+[.?!]+").unwrap());

static HTML_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// Replace every markup tag with a space.
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG_REGEX.replace_all(text, " ").into_owned()
}

/// Collapse whitespace and keep at most `max_sentences` sentence-like units.
///
/// Text without any terminal punctuation is returned whitespace-collapsed
/// but otherwise untouched.
pub fn normalize(raw: Option<&str>, max_sentences: usize) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let text = collapse_whitespace(raw);
    let sentences: Vec<&str> = SENTENCE_REGEX
        .find_iter(&text)
        .map(|m| m.as_str().trim())
        .collect();

    if sentences.is_empty() {
        return text;
    }

    sentences
        .into_iter()
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
