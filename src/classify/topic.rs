use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::classify::whole_word;

pub const TITLE_WEIGHT: u32 = 3;
pub const DESCRIPTION_WEIGHT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Games,
    Customs,
    Rituals,
    Media,
    Uncategorized,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Games => "Games",
            Category::Customs => "Customs",
            Category::Rituals => "Rituals",
            Category::Media => "Media",
            Category::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories in declaration order. Ties on score go to the earlier entry.
pub const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &[
            "food",
            "cuisine",
            "culinary",
            "tasting",
            "recipe",
            "kitchen",
            "dining",
            "eat",
            "beverage",
            "drink",
            "wine",
            "feast",
            "restaurant",
            "chef",
            "taste",
        ],
    ),
    (
        Category::Games,
        &[
            "game",
            "gaming",
            "play",
            "tournament",
            "competition",
            "board game",
            "video game",
            "esports",
            "match",
            "player",
        ],
    ),
    (
        Category::Customs,
        &[
            "custom",
            "tradition",
            "traditional",
            "heritage",
            "cultural",
            "folklore",
            "social",
            "etiquette",
            "lifestyle",
            "clothing",
            "attire",
            "craft",
            "daily life",
        ],
    ),
    (
        Category::Rituals,
        &[
            "ritual",
            "ceremony",
            "ceremonial",
            "rite",
            "religious",
            "spiritual",
            "worship",
            "prayer",
            "shrine",
            "temple",
            "offering",
            "meditation",
            "holy",
        ],
    ),
    (
        Category::Media,
        &[
            "media",
            "film",
            "movie",
            "documentary",
            "screening",
            "broadcast",
            "journalism",
            "art",
            "artist",
            "exhibition",
            "performance",
            "music",
            "concert",
            "dance",
            "theater",
            "author",
            "book",
            "reading",
            "gallery",
        ],
    ),
];

static CATEGORY_PATTERNS: LazyLock<Vec<(Category, Vec<Regex>)>> = LazyLock::new(|| {
    CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            (
                *category,
                keywords.iter().map(|keyword| whole_word(keyword)).collect(),
            )
        })
        .collect()
});

/// Score every category against an event's title and description.
///
/// Each keyword contributes [`TITLE_WEIGHT`] when it appears in the title and
/// [`DESCRIPTION_WEIGHT`] when it appears in the description, so distinct
/// keywords add up while repeats of one keyword count once per field.
pub fn score_categories(title: &str, description: &str) -> Vec<(Category, u32)> {
    CATEGORY_PATTERNS
        .iter()
        .map(|(category, patterns)| {
            let score = patterns
                .iter()
                .map(|pattern| {
                    let mut score = 0;
                    if pattern.is_match(title) {
                        score += TITLE_WEIGHT;
                    }
                    if pattern.is_match(description) {
                        score += DESCRIPTION_WEIGHT;
                    }
                    score
                })
                .sum();
            (*category, score)
        })
        .collect()
}

/// Highest-scoring category, or `Uncategorized` when nothing matched.
pub fn classify_category(title: &str, description: &str) -> Category {
    let mut best = Category::Uncategorized;
    let mut max_score = 0;

    for (category, score) in score_categories(title, description) {
        if score > max_score {
            max_score = score;
            best = category;
        }
    }

    best
}
