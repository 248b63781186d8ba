use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod catalog;
pub mod performer;
pub mod recommendation;
pub mod scene;

pub use catalog::{Catalog, CatalogBuildResult, CatalogProblem, CatalogSnapshot};
pub use performer::{BraSize, CupSize, PerformerProfile};
pub use recommendation::{
    PerformerRecommendations, RecommendationList, Recommendations, RunWarning, ScoredCandidate,
    SceneRecommendations,
};
pub use scene::SceneRecord;

/// Identifier of a scoring rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    CupSize,
    BmiCupRatio,
    HeightCupRatio,
    TagSimilarity,
    SceneTypes,
    AgeRange,
    Novelty,
    SceneQuality,
    Versatility,
    FavoriteSimilarity,
    PerformerMatch,
    StudioMatch,
    LowViewCount,
}

impl CriterionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionKind::CupSize => "cup_size",
            CriterionKind::BmiCupRatio => "bmi_cup_ratio",
            CriterionKind::HeightCupRatio => "height_cup_ratio",
            CriterionKind::TagSimilarity => "tag_similarity",
            CriterionKind::SceneTypes => "scene_types",
            CriterionKind::AgeRange => "age_range",
            CriterionKind::Novelty => "novelty",
            CriterionKind::SceneQuality => "scene_quality",
            CriterionKind::Versatility => "versatility",
            CriterionKind::FavoriteSimilarity => "favorite_similarity",
            CriterionKind::PerformerMatch => "performer_match",
            CriterionKind::StudioMatch => "studio_match",
            CriterionKind::LowViewCount => "low_view_count",
        }
    }
}

impl Display for CriterionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named recommendation bucket with its own top-K selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    // Performers
    SimilarCupSize,
    SimilarProportions,
    SimilarTags,
    SimilarSceneTypes,
    SimilarAge,
    HighQuality,
    HiddenGems,
    Novelty,
    Versatile,
    SimilarToFavorites,
    ZeroCounter,
    // Scenes
    TagSimilarity,
    FavoritePerformers,
    PreferredStudios,
    HighQualityUnwatched,
    NoveltyUnwatched,
    TopUnwatched,
}

impl Category {
    pub const PERFORMER: [Category; 11] = [
        Category::SimilarCupSize,
        Category::SimilarProportions,
        Category::SimilarTags,
        Category::SimilarSceneTypes,
        Category::SimilarAge,
        Category::HighQuality,
        Category::HiddenGems,
        Category::Novelty,
        Category::Versatile,
        Category::SimilarToFavorites,
        Category::ZeroCounter,
    ];

    pub const SCENE: [Category; 6] = [
        Category::TagSimilarity,
        Category::FavoritePerformers,
        Category::PreferredStudios,
        Category::HighQualityUnwatched,
        Category::NoveltyUnwatched,
        Category::TopUnwatched,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SimilarCupSize => "similar_cup_size",
            Category::SimilarProportions => "similar_proportions",
            Category::SimilarTags => "similar_tags",
            Category::SimilarSceneTypes => "similar_scene_types",
            Category::SimilarAge => "similar_age",
            Category::HighQuality => "high_quality",
            Category::HiddenGems => "hidden_gems",
            Category::Novelty => "novelty",
            Category::Versatile => "versatile",
            Category::SimilarToFavorites => "similar_to_favorites",
            Category::ZeroCounter => "zero_counter",
            Category::TagSimilarity => "tag_similarity",
            Category::FavoritePerformers => "favorite_performers",
            Category::PreferredStudios => "preferred_studios",
            Category::HighQualityUnwatched => "high_quality_unwatched",
            Category::NoveltyUnwatched => "novelty_unwatched",
            Category::TopUnwatched => "top_unwatched",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::PERFORMER
            .iter()
            .chain(Category::SCENE.iter())
            .find(|c| c.as_str() == s.trim())
            .copied()
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}
