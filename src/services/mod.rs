pub mod aggregator;
pub mod assembler;
pub mod categories;
pub mod criteria;
pub mod normalizer;
pub mod providers;
pub mod ranker;
pub mod recommendations;

pub use aggregator::WeightedAggregator;
pub use criteria::{Criterion, CriterionSet, PerformerReference, SceneReference};
pub use providers::{write_recommendations, JsonFileSource, ProfileSource};
pub use ranker::{CategoryRule, RankedPool, Selection};
pub use recommendations::{
    get_recommendations, recommend_performers, recommend_scenes, run_batch, RecommendationKind,
};
