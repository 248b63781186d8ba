use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Category, CriterionKind};

/// A candidate with its per-criterion scores and the composite derived from them
///
/// Only the aggregator creates these, so the composite always matches the scores
/// under the weight table of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    id: String,
    name: String,
    scores: BTreeMap<CriterionKind, f64>,
    composite: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
}

impl ScoredCandidate {
    pub(crate) fn new(
        id: String,
        name: String,
        scores: BTreeMap<CriterionKind, f64>,
        composite: f64,
    ) -> Self {
        Self {
            id,
            name,
            scores,
            composite,
            category: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scores(&self) -> &BTreeMap<CriterionKind, f64> {
        &self.scores
    }

    pub fn score(&self, kind: CriterionKind) -> Option<f64> {
        self.scores.get(&kind).copied()
    }

    pub fn composite(&self) -> f64 {
        self.composite
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub(crate) fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// Ordered recommendations with the metadata of the run that produced them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub generated_at: DateTime<Utc>,
    pub min_similarity_score: f64,
    /// Favorite ids the candidates were compared against
    pub reference_ids: BTreeSet<String>,
    pub entries: Vec<ScoredCandidate>,
}

impl RecommendationList {
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recovered problems surfaced alongside the results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// The criterion had no reference data and was left out of every composite
    EmptyReference { criterion: CriterionKind },
    /// No favorites; attribute criteria compared against top rated performers
    ReferenceFallback { reference_ids: BTreeSet<String> },
    /// Records dropped while building the catalog
    DroppedRecords { count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformerRecommendations {
    pub top: RecommendationList,
    pub by_category: BTreeMap<Category, RecommendationList>,
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRecommendations {
    pub top: RecommendationList,
    /// Scenes featuring at least one favorite performer
    pub with_favorite_performers: RecommendationList,
    /// Scenes featuring no favorite performer
    pub without_favorite_performers: RecommendationList,
    pub by_category: BTreeMap<Category, RecommendationList>,
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performers: Option<PerformerRecommendations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenes: Option<SceneRecommendations>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_candidate_serialization() {
        let mut scores = BTreeMap::new();
        scores.insert(CriterionKind::CupSize, 1.0);
        scores.insert(CriterionKind::TagSimilarity, 0.5);
        let candidate = ScoredCandidate::new("p1".to_string(), "Ann".to_string(), scores, 0.7)
            .with_category(Category::SimilarTags);

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["scores"]["cup_size"], 1.0);
        assert_eq!(json["composite"], 0.7);
        assert_eq!(json["category"], "similar_tags");
    }

    #[test]
    fn test_warning_serialization() {
        let warning = RunWarning::EmptyReference {
            criterion: CriterionKind::FavoriteSimilarity,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "empty_reference");
        assert_eq!(json["criterion"], "favorite_similarity");
    }
}
