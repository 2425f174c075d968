//! Asset search keyword generation.

use crate::constants::limits::MAX_ASSET_KEYWORDS;

const BRAINROT_MAPPINGS: &[(&str, &[&str])] = &[
    ("messi", &["soccer", "football", "athlete", "sports"]),
    ("ronaldo", &["soccer", "football", "athlete", "sports"]),
    ("football", &["soccer", "sports", "stadium", "athlete"]),
    ("soccer", &["football", "sports", "stadium", "goal"]),
    ("basketball", &["sports", "athlete", "basketball court", "slam dunk"]),
    ("gaming", &["gaming", "esports", "computer", "neon lights"]),
    ("backflip", &["gymnastics", "acrobatics", "parkour", "extreme sports"]),
    ("backflips", &["gymnastics", "acrobatics", "parkour", "extreme sports"]),
    ("car", &["car", "racing", "sports car", "speed"]),
    ("money", &["money", "cash", "success", "business"]),
    ("gym", &["gym", "fitness", "workout", "muscles"]),
    ("workout", &["fitness", "gym", "exercise", "training"]),
];

const BRAINROT_STYLE_WORDS: &[&str] = &["action", "dynamic", "energy"];

const AMBIENT_WORDS: &[&str] = &["calm", "peaceful", "serene", "ambient", "relaxing", "nature"];

/// Lowercased topic words longer than two characters
pub fn generic_keywords(topic: &str) -> Vec<String> {
    topic
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Stock-footage friendly terms for high-energy topics.
///
/// Mapped terms win over the raw topic words; style words are appended and the
/// result is deduplicated and capped.
pub fn brainrot_keywords(topic: &str) -> Vec<String> {
    let topic_lower = topic.to_lowercase();

    let mut keywords: Vec<String> = BRAINROT_MAPPINGS
        .iter()
        .filter(|(key, _)| topic_lower.contains(key))
        .flat_map(|(_, mapped)| mapped.iter().map(|word| word.to_string()))
        .collect();

    if keywords.is_empty() {
        keywords = generic_keywords(topic);
    }
    keywords.extend(BRAINROT_STYLE_WORDS.iter().map(|word| word.to_string()));

    let mut result: Vec<String> = Vec::with_capacity(MAX_ASSET_KEYWORDS);
    for keyword in keywords {
        if !result.contains(&keyword) {
            result.push(keyword);
        }
        if result.len() == MAX_ASSET_KEYWORDS {
            break;
        }
    }
    result
}

/// Topic words followed by calming atmosphere terms
pub fn ambient_keywords(topic: &str) -> Vec<String> {
    let mut keywords = generic_keywords(topic);
    keywords.extend(AMBIENT_WORDS.iter().map(|word| word.to_string()));
    keywords
}
