use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
///
/// Recommendation settings come from two prefixed groups, `RECOMMENDATIONS_*`
/// for performers and `SCENE_RECOMMENDATIONS_*` for scenes.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// JSON snapshot exported from the profile store
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Directory the result files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Upper bound for one batch run
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    #[serde(skip)]
    pub performers: PerformerSettings,

    #[serde(skip)]
    pub scenes: SceneSettings,
}

/// Performer recommendation settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PerformerSettings {
    #[serde(default = "default_min_similarity_score")]
    pub min_similarity_score: f64,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
    #[serde(default = "default_max_recommendations_per_category")]
    pub max_recommendations_per_category: usize,
    /// Whether performers with a zero O-counter may be recommended
    #[serde(default = "default_true")]
    pub include_zero_counter: bool,
    #[serde(default = "default_rating_scale")]
    pub rating_scale: f64,
    /// Top rated performers used as reference when there are no favorites
    #[serde(default = "default_reference_fallback_count")]
    pub reference_fallback_count: usize,
    #[serde(default)]
    pub disabled_categories: Vec<String>,

    #[serde(default = "default_true")]
    pub enable_cup_size: bool,
    #[serde(default = "default_weight_cup_size")]
    pub weight_cup_size: f64,
    /// Cup ordinal difference at which similarity reaches 0
    #[serde(default = "default_cup_size_tolerance")]
    pub cup_size_tolerance: Option<f64>,

    #[serde(default = "default_true")]
    pub enable_bmi_cup_ratio: bool,
    #[serde(default = "default_weight_ratio")]
    pub weight_bmi_cup_ratio: f64,
    #[serde(default = "default_bmi_cup_tolerance")]
    pub bmi_cup_tolerance: Option<f64>,

    #[serde(default = "default_true")]
    pub enable_height_cup_ratio: bool,
    #[serde(default = "default_weight_ratio")]
    pub weight_height_cup_ratio: f64,
    #[serde(default = "default_height_cup_tolerance")]
    pub height_cup_tolerance: Option<f64>,

    #[serde(default = "default_true")]
    pub enable_tag_similarity: bool,
    #[serde(default = "default_weight_tag_similarity")]
    pub weight_tag_similarity: f64,

    #[serde(default = "default_true")]
    pub enable_scene_types: bool,
    #[serde(default = "default_weight_scene_types")]
    pub weight_scene_types: f64,

    #[serde(default = "default_true")]
    pub enable_age_range: bool,
    #[serde(default = "default_weight_age_similarity")]
    pub weight_age_similarity: f64,
    /// Years
    #[serde(default = "default_age_range_tolerance")]
    pub age_range_tolerance: Option<f64>,

    #[serde(default = "default_true")]
    pub enable_novelty: bool,
    #[serde(default = "default_weight_novelty")]
    pub weight_novelty: f64,
    #[serde(default = "default_novelty_timeframe_days")]
    pub novelty_timeframe_days: Option<u32>,

    #[serde(default = "default_true")]
    pub enable_scene_quality: bool,
    #[serde(default = "default_weight_scene_quality")]
    pub weight_scene_quality: f64,
    #[serde(default = "default_min_scene_rating")]
    pub min_scene_rating: Option<f64>,

    #[serde(default = "default_true")]
    pub enable_versatility: bool,
    #[serde(default = "default_weight_versatility")]
    pub weight_versatility: f64,

    #[serde(default = "default_true")]
    pub enable_similar_to_favorites: bool,
    #[serde(default = "default_weight_favorite_similarity")]
    pub weight_favorite_similarity: f64,
    #[serde(default = "default_favorite_similarity_threshold")]
    pub favorite_similarity_threshold: Option<f64>,
}

/// Scene recommendation settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SceneSettings {
    #[serde(default = "default_scene_min_similarity_score")]
    pub min_similarity_score: f64,
    #[serde(default = "default_scene_max_recommendations")]
    pub max_recommendations: usize,
    #[serde(default = "default_max_recommendations_per_category")]
    pub max_recommendations_per_category: usize,
    #[serde(default = "default_rating_scale")]
    pub rating_scale: f64,
    /// Scenes viewed more often than this are considered discovered
    #[serde(default)]
    pub discovered_view_count: u32,
    #[serde(default)]
    pub disabled_categories: Vec<String>,

    #[serde(default = "default_true")]
    pub enable_tag_similarity: bool,
    #[serde(default = "default_scene_weight_tag_similarity")]
    pub weight_tag_similarity: f64,

    #[serde(default = "default_true")]
    pub enable_performer_match: bool,
    #[serde(default = "default_weight_performer_match")]
    pub weight_performer_match: f64,

    #[serde(default = "default_true")]
    pub enable_studio_match: bool,
    #[serde(default = "default_weight_studio_match")]
    pub weight_studio_match: f64,

    #[serde(default = "default_true")]
    pub enable_high_quality: bool,
    #[serde(default = "default_weight_scene_quality")]
    pub weight_high_quality: f64,
    #[serde(default = "default_min_scene_rating")]
    pub min_scene_rating: Option<f64>,

    #[serde(default = "default_true")]
    pub enable_novelty: bool,
    #[serde(default = "default_scene_weight_novelty")]
    pub weight_novelty: f64,
    #[serde(default = "default_novelty_timeframe_days")]
    pub novelty_timeframe_days: Option<u32>,

    #[serde(default = "default_true")]
    pub enable_low_view_count: bool,
    #[serde(default = "default_weight_low_view_count")]
    pub weight_low_view_count: f64,

    /// Scenes rated at least this much shape the preference profile
    #[serde(default = "default_min_rating_for_preference")]
    pub min_rating_for_preference: f64,
    /// Scenes viewed at least this often shape the preference profile
    #[serde(default = "default_min_plays_for_preference")]
    pub min_plays_for_preference: u32,
    /// Tags and studios need this many preference scenes to count
    #[serde(default = "default_min_preference_occurrence")]
    pub min_preference_occurrence: usize,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./data/catalog_snapshot.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_true() -> bool {
    true
}

fn default_min_similarity_score() -> f64 {
    0.75
}

fn default_scene_min_similarity_score() -> f64 {
    0.5
}

fn default_max_recommendations() -> usize {
    10
}

fn default_scene_max_recommendations() -> usize {
    15
}

fn default_max_recommendations_per_category() -> usize {
    5
}

fn default_rating_scale() -> f64 {
    100.0
}

fn default_reference_fallback_count() -> usize {
    5
}

fn default_weight_cup_size() -> f64 {
    0.4
}

fn default_cup_size_tolerance() -> Option<f64> {
    Some(4.0)
}

fn default_weight_ratio() -> f64 {
    0.2
}

fn default_bmi_cup_tolerance() -> Option<f64> {
    Some(5.0)
}

fn default_height_cup_tolerance() -> Option<f64> {
    Some(50.0)
}

fn default_weight_tag_similarity() -> f64 {
    0.6
}

fn default_weight_scene_types() -> f64 {
    0.5
}

fn default_weight_age_similarity() -> f64 {
    0.4
}

fn default_age_range_tolerance() -> Option<f64> {
    Some(5.0)
}

fn default_weight_novelty() -> f64 {
    0.3
}

fn default_novelty_timeframe_days() -> Option<u32> {
    Some(30)
}

fn default_weight_scene_quality() -> f64 {
    0.5
}

fn default_min_scene_rating() -> Option<f64> {
    Some(60.0)
}

fn default_weight_versatility() -> f64 {
    0.4
}

fn default_weight_favorite_similarity() -> f64 {
    0.7
}

fn default_favorite_similarity_threshold() -> Option<f64> {
    Some(0.7)
}

fn default_scene_weight_tag_similarity() -> f64 {
    0.7
}

fn default_weight_performer_match() -> f64 {
    0.8
}

fn default_weight_studio_match() -> f64 {
    0.3
}

fn default_scene_weight_novelty() -> f64 {
    0.4
}

fn default_weight_low_view_count() -> f64 {
    0.2
}

fn default_min_rating_for_preference() -> f64 {
    75.0
}

fn default_min_plays_for_preference() -> u32 {
    1
}

fn default_min_preference_occurrence() -> usize {
    2
}

impl Default for PerformerSettings {
    fn default() -> Self {
        Self {
            min_similarity_score: default_min_similarity_score(),
            max_recommendations: default_max_recommendations(),
            max_recommendations_per_category: default_max_recommendations_per_category(),
            include_zero_counter: true,
            rating_scale: default_rating_scale(),
            reference_fallback_count: default_reference_fallback_count(),
            disabled_categories: Vec::new(),
            enable_cup_size: true,
            weight_cup_size: default_weight_cup_size(),
            cup_size_tolerance: default_cup_size_tolerance(),
            enable_bmi_cup_ratio: true,
            weight_bmi_cup_ratio: default_weight_ratio(),
            bmi_cup_tolerance: default_bmi_cup_tolerance(),
            enable_height_cup_ratio: true,
            weight_height_cup_ratio: default_weight_ratio(),
            height_cup_tolerance: default_height_cup_tolerance(),
            enable_tag_similarity: true,
            weight_tag_similarity: default_weight_tag_similarity(),
            enable_scene_types: true,
            weight_scene_types: default_weight_scene_types(),
            enable_age_range: true,
            weight_age_similarity: default_weight_age_similarity(),
            age_range_tolerance: default_age_range_tolerance(),
            enable_novelty: true,
            weight_novelty: default_weight_novelty(),
            novelty_timeframe_days: default_novelty_timeframe_days(),
            enable_scene_quality: true,
            weight_scene_quality: default_weight_scene_quality(),
            min_scene_rating: default_min_scene_rating(),
            enable_versatility: true,
            weight_versatility: default_weight_versatility(),
            enable_similar_to_favorites: true,
            weight_favorite_similarity: default_weight_favorite_similarity(),
            favorite_similarity_threshold: default_favorite_similarity_threshold(),
        }
    }
}

impl PerformerSettings {
    /// Settings with every criterion switched off, for enabling a chosen few
    pub fn all_disabled() -> Self {
        Self {
            enable_cup_size: false,
            enable_bmi_cup_ratio: false,
            enable_height_cup_ratio: false,
            enable_tag_similarity: false,
            enable_scene_types: false,
            enable_age_range: false,
            enable_novelty: false,
            enable_scene_quality: false,
            enable_versatility: false,
            enable_similar_to_favorites: false,
            ..Self::default()
        }
    }
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            min_similarity_score: default_scene_min_similarity_score(),
            max_recommendations: default_scene_max_recommendations(),
            max_recommendations_per_category: default_max_recommendations_per_category(),
            rating_scale: default_rating_scale(),
            discovered_view_count: 0,
            disabled_categories: Vec::new(),
            enable_tag_similarity: true,
            weight_tag_similarity: default_scene_weight_tag_similarity(),
            enable_performer_match: true,
            weight_performer_match: default_weight_performer_match(),
            enable_studio_match: true,
            weight_studio_match: default_weight_studio_match(),
            enable_high_quality: true,
            weight_high_quality: default_weight_scene_quality(),
            min_scene_rating: default_min_scene_rating(),
            enable_novelty: true,
            weight_novelty: default_scene_weight_novelty(),
            novelty_timeframe_days: default_novelty_timeframe_days(),
            enable_low_view_count: true,
            weight_low_view_count: default_weight_low_view_count(),
            min_rating_for_preference: default_min_rating_for_preference(),
            min_plays_for_preference: default_min_plays_for_preference(),
            min_preference_occurrence: default_min_preference_occurrence(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars(vars: Vec<(String, String)>) -> anyhow::Result<Self> {
        let mut config = envy::from_iter::<_, Config>(vars.clone())
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        config.performers = envy::prefixed("RECOMMENDATIONS_")
            .from_iter(vars.clone())
            .map_err(|e| anyhow::anyhow!("Failed to load performer settings: {}", e))?;

        config.scenes = envy::prefixed("SCENE_RECOMMENDATIONS_")
            .from_iter(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load scene settings: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_vars(vec![]).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.run_timeout_secs, None);
        assert_eq!(config.performers, PerformerSettings::default());
        assert_eq!(config.scenes, SceneSettings::default());
        assert_eq!(config.performers.min_similarity_score, 0.75);
        assert_eq!(config.performers.cup_size_tolerance, Some(4.0));
    }

    #[test]
    fn test_prefixed_settings() {
        let config = Config::from_vars(vars(&[
            ("OUTPUT_DIR", "/tmp/recs"),
            ("RUN_TIMEOUT_SECS", "30"),
            ("RECOMMENDATIONS_WEIGHT_CUP_SIZE", "0.9"),
            ("RECOMMENDATIONS_ENABLE_NOVELTY", "false"),
            ("RECOMMENDATIONS_DISABLED_CATEGORIES", "zero_counter,versatile"),
            ("SCENE_RECOMMENDATIONS_DISCOVERED_VIEW_COUNT", "2"),
        ]))
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/recs"));
        assert_eq!(config.run_timeout_secs, Some(30));
        assert_eq!(config.performers.weight_cup_size, 0.9);
        assert!(!config.performers.enable_novelty);
        assert_eq!(
            config.performers.disabled_categories,
            vec!["zero_counter".to_string(), "versatile".to_string()]
        );
        assert_eq!(config.scenes.discovered_view_count, 2);
        // Scene settings do not pick up performer variables
        assert_eq!(config.scenes.weight_tag_similarity, 0.7);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let result = Config::from_vars(vars(&[("RECOMMENDATIONS_WEIGHT_CUP_SIZE", "heavy")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_all_disabled() {
        let settings = PerformerSettings::all_disabled();
        assert!(!settings.enable_cup_size);
        assert!(!settings.enable_similar_to_favorites);
        assert_eq!(settings.weight_cup_size, 0.4);
    }
}
