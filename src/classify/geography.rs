use regex::Regex;
use std::sync::LazyLock;

use crate::classify::whole_word;
use crate::normalize::strip_html_tags;

pub const DEFAULT_COUNTRY: &str = "United States";

/// Keyword to country label. Entries are tried in declaration order, so an
/// earlier keyword wins when several match the same field.
pub const COUNTRY_KEYWORDS: &[(&str, &str)] = &[
    ("japan", "Japan"),
    ("japanese", "Japan"),
    ("korea", "South Korea"),
    ("korean", "South Korea"),
    ("north korea", "North Korea"),
    ("dprk", "North Korea"),
    ("china", "China"),
    ("chinese", "China"),
    ("taiwan", "Taiwan"),
    ("taiwanese", "Taiwan"),
    ("india", "India"),
    ("indian", "India"),
    ("vietnam", "Vietnam"),
    ("vietnamese", "Vietnam"),
    ("thailand", "Thailand"),
    ("thai", "Thailand"),
    ("philippines", "Philippines"),
    ("filipino", "Philippines"),
    ("indonesia", "Indonesia"),
    ("indonesian", "Indonesia"),
    ("pakistan", "Pakistan"),
    ("pakistani", "Pakistan"),
    ("bangladesh", "Bangladesh"),
    ("bangladeshi", "Bangladesh"),
    ("uzbekistan", "Uzbekistan"),
    ("uzbek", "Uzbekistan"),
    ("iran", "Iran"),
    ("iranian", "Iran"),
    ("persian", "Iran"),
    ("mexico", "Mexico"),
    ("mexican", "Mexico"),
    ("canada", "Canada"),
    ("canadian", "Canada"),
];

static COUNTRY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    COUNTRY_KEYWORDS
        .iter()
        .map(|(keyword, country)| (whole_word(keyword), *country))
        .collect()
});

/// Pick the country an event is about.
///
/// The title is searched first and any hit there wins outright; only then is
/// the tag-stripped description searched. Falls back to [`DEFAULT_COUNTRY`].
pub fn classify_country(title: &str, description: &str) -> &'static str {
    let description = strip_html_tags(description);

    first_match(title)
        .or_else(|| first_match(&description))
        .unwrap_or(DEFAULT_COUNTRY)
}

fn first_match(text: &str) -> Option<&'static str> {
    COUNTRY_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, country)| *country)
}
