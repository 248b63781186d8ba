use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::models::{
    Category, PerformerRecommendations, RecommendationList, RunWarning, ScoredCandidate,
    SceneRecommendations,
};

use super::ranker::Selection;

/// Metadata shared by every list of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub min_similarity_score: f64,
    pub reference_ids: BTreeSet<String>,
}

impl RunMetadata {
    fn list(&self, category: Option<Category>, entries: Vec<ScoredCandidate>) -> RecommendationList {
        RecommendationList {
            category,
            generated_at: self.generated_at,
            min_similarity_score: self.min_similarity_score,
            reference_ids: self.reference_ids.clone(),
            entries,
        }
    }

    fn category_lists(
        &self,
        by_category: BTreeMap<Category, Vec<ScoredCandidate>>,
    ) -> BTreeMap<Category, RecommendationList> {
        by_category
            .into_iter()
            .map(|(category, entries)| (category, self.list(Some(category), entries)))
            .collect()
    }
}

pub fn assemble_performers(
    metadata: &RunMetadata,
    selection: Selection,
    warnings: Vec<RunWarning>,
) -> PerformerRecommendations {
    PerformerRecommendations {
        top: metadata.list(None, selection.top),
        by_category: metadata.category_lists(selection.by_category),
        warnings,
    }
}

/// Scene output, with the favorite-performer split handed in by the ranker
pub fn assemble_scenes(
    metadata: &RunMetadata,
    selection: Selection,
    with_favorite_performers: Vec<ScoredCandidate>,
    without_favorite_performers: Vec<ScoredCandidate>,
    warnings: Vec<RunWarning>,
) -> SceneRecommendations {
    SceneRecommendations {
        top: metadata.list(None, selection.top),
        with_favorite_performers: metadata.list(None, with_favorite_performers),
        without_favorite_performers: metadata.list(None, without_favorite_performers),
        by_category: metadata.category_lists(selection.by_category),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CriterionKind;
    use chrono::TimeZone;

    fn candidate(id: &str) -> ScoredCandidate {
        let scores = [(CriterionKind::Novelty, 1.0)].into_iter().collect();
        ScoredCandidate::new(id.to_string(), id.to_string(), scores, 1.0)
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            generated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            min_similarity_score: 0.5,
            reference_ids: ["fav".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_performer_lists_carry_metadata() {
        let mut by_category = BTreeMap::new();
        by_category.insert(
            Category::Novelty,
            vec![candidate("b").with_category(Category::Novelty)],
        );
        let selection = Selection {
            top: vec![candidate("a"), candidate("b")],
            by_category,
        };

        let output = assemble_performers(&metadata(), selection, vec![]);

        assert_eq!(output.top.ids(), vec!["a", "b"]);
        assert_eq!(output.top.category, None);
        assert_eq!(output.top.min_similarity_score, 0.5);
        let novelty = &output.by_category[&Category::Novelty];
        assert_eq!(novelty.category, Some(Category::Novelty));
        assert!(novelty.reference_ids.contains("fav"));
    }

    #[test]
    fn test_scene_split_lists() {
        let output = assemble_scenes(
            &metadata(),
            Selection::default(),
            vec![candidate("s1")],
            vec![candidate("s2"), candidate("s3")],
            vec![RunWarning::DroppedRecords { count: 1 }],
        );

        assert!(output.top.is_empty());
        assert_eq!(output.with_favorite_performers.ids(), vec!["s1"]);
        assert_eq!(output.without_favorite_performers.len(), 2);
        assert_eq!(output.warnings.len(), 1);
    }
}
