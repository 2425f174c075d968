//! # Director
//!
//! Picks a recipe for jobs submitted with `auto`.
//!
//! A director is invoked once per job through the stage executor. Any failure
//! it reports (error, timeout, an unregistered or incompatible choice) is
//! downgraded by the scheduler to the fallback recipe; it never fails a job.

use crate::error::StageError;
use crate::recipes::RecipeKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A director's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeChoice {
    pub recipe: RecipeKind,
    pub reasoning: String,
}

#[async_trait]
pub trait Director: Send + Sync {
    async fn select_recipe(&self, topic: &str) -> Result<RecipeChoice, StageError>;

    fn name(&self) -> &'static str {
        "director"
    }
}

/// Scores recipes by keyword hits in the topic
#[derive(Debug, Clone)]
pub struct KeywordDirector {
    patterns: Vec<(RecipeKind, Vec<&'static str>)>,
}

impl KeywordDirector {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                (
                    RecipeKind::Ambient,
                    vec![
                        "ambient", "calm", "peaceful", "serene", "relaxing", "lo-fi", "lofi",
                        "meditation", "zen", "nature", "forest", "ocean", "rain",
                    ],
                ),
                (
                    RecipeKind::Loop10h,
                    vec!["10 hour", "10h", "loop", "looping", "long", "extended", "ambient loop"],
                ),
                (
                    RecipeKind::News,
                    vec![
                        "news", "breaking", "report", "update", "announcement", "headline",
                        "story", "journalism",
                    ],
                ),
                (
                    RecipeKind::Stories,
                    vec![
                        "story",
                        "tale",
                        "narrative",
                        "short story",
                        "storytime",
                        "instagram story",
                    ],
                ),
                (
                    RecipeKind::Brainrot,
                    vec![
                        "brainrot",
                        "chaos",
                        "intense",
                        "fast",
                        "energetic",
                        "viral",
                        "meme",
                        "trending",
                    ],
                ),
            ],
        }
    }

    /// Keyword hit count per recipe, in scoring order
    pub fn scores(&self, topic: &str) -> Vec<(RecipeKind, usize)> {
        let topic_lower = topic.to_lowercase();
        self.patterns
            .iter()
            .map(|(recipe, keywords)| {
                let hits = keywords
                    .iter()
                    .filter(|keyword| topic_lower.contains(*keyword))
                    .count();
                (*recipe, hits)
            })
            .collect()
    }

    pub fn choose(&self, topic: &str) -> RecipeChoice {
        let mut best: Option<(RecipeKind, usize)> = None;
        for (recipe, hits) in self.scores(topic) {
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((recipe, hits));
            }
        }

        match best {
            Some((recipe, hits)) => RecipeChoice {
                recipe,
                reasoning: format!("Matched {hits} keyword(s) for {recipe} recipe"),
            },
            None => RecipeChoice {
                recipe: RecipeKind::Ambient,
                reasoning: "No keywords matched, defaulting to ambient style".to_string(),
            },
        }
    }
}

impl Default for KeywordDirector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Director for KeywordDirector {
    async fn select_recipe(&self, topic: &str) -> Result<RecipeChoice, StageError> {
        let choice = self.choose(topic);
        debug!(
            recipe = %choice.recipe,
            reasoning = %choice.reasoning,
            "Keyword director selected recipe"
        );
        Ok(choice)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serene_forest_is_ambient() {
        let choice = KeywordDirector::new().choose("serene forest");
        assert_eq!(choice.recipe, RecipeKind::Ambient);
        assert!(choice.reasoning.contains("2 keyword(s)"));
    }

    #[test]
    fn test_highest_score_wins() {
        let director = KeywordDirector::new();
        assert_eq!(
            director.choose("Breaking news report: market update").recipe,
            RecipeKind::News
        );
        assert_eq!(
            director.choose("viral meme chaos compilation").recipe,
            RecipeKind::Brainrot
        );
        assert_eq!(
            director.choose("10 hour looping fireplace").recipe,
            RecipeKind::Loop10h
        );
    }

    #[test]
    fn test_ties_keep_scoring_order() {
        // "story" scores one for news and one for stories; news is scored first
        assert_eq!(KeywordDirector::new().choose("a story").recipe, RecipeKind::News);
    }

    #[test]
    fn test_no_match_defaults_to_ambient() {
        let choice = KeywordDirector::new().choose("quarterly tax filing");
        assert_eq!(choice.recipe, RecipeKind::Ambient);
        assert!(choice.reasoning.contains("No keywords matched"));
    }

    #[tokio::test]
    async fn test_director_trait_never_fails() {
        let director = KeywordDirector::new();
        let choice = director.select_recipe("").await.unwrap();
        assert_eq!(choice.recipe, RecipeKind::Ambient);
    }
}
