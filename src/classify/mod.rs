pub mod geography;
pub mod topic;

pub use geography::{DEFAULT_COUNTRY, classify_country};
pub use topic::{Category, classify_category, score_categories};

use regex::Regex;

/// Case-insensitive, word-boundary anchored pattern for a static keyword.
fn whole_word(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).unwrap()
}
