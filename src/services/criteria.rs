use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::{
    config::{PerformerSettings, SceneSettings},
    error::{AppError, AppResult},
    models::{Catalog, CriterionKind, PerformerProfile, SceneRecord},
};

use super::normalizer::{continuous_similarity, jaccard, mean, rating_quality, recency};

/// A single scoring rule
///
/// Implementations are pure functions of the candidate and the reference
/// context, so candidates can be scored in any order or in parallel.
pub trait Criterion<C, R>: Send + Sync {
    fn kind(&self) -> CriterionKind;

    /// Score in `[0, 1]`, or `None` when the candidate or the reference lacks
    /// the attribute
    fn score(&self, candidate: &C, reference: &R) -> Option<f64>;

    /// Whether the reference carries anything to compare against
    ///
    /// A criterion without reference is undefined for every candidate of the run.
    fn has_reference(&self, _reference: &R) -> bool {
        true
    }
}

/// Enabled criteria of one run with their weights
pub struct CriterionSet<C, R> {
    criteria: Vec<Box<dyn Criterion<C, R>>>,
    weights: BTreeMap<CriterionKind, f64>,
}

impl<C, R> Default for CriterionSet<C, R> {
    fn default() -> Self {
        Self {
            criteria: Vec::new(),
            weights: BTreeMap::new(),
        }
    }
}

impl<C, R> CriterionSet<C, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T>(&mut self, criterion: T, weight: f64)
    where
        T: Criterion<C, R> + 'static,
    {
        self.weights.insert(criterion.kind(), weight);
        self.criteria.push(Box::new(criterion));
    }

    pub fn weights(&self) -> &BTreeMap<CriterionKind, f64> {
        &self.weights
    }

    pub fn is_enabled(&self, kind: CriterionKind) -> bool {
        self.weights.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Scores one candidate on every criterion, keeping only defined scores
    pub fn score(&self, candidate: &C, reference: &R) -> BTreeMap<CriterionKind, f64> {
        self.criteria
            .iter()
            .filter_map(|criterion| {
                criterion
                    .score(candidate, reference)
                    .filter(|s| s.is_finite())
                    .map(|s| (criterion.kind(), s.clamp(0.0, 1.0)))
            })
            .collect()
    }

    /// Criteria that are undefined for the whole run
    pub fn without_reference(&self, reference: &R) -> Vec<CriterionKind> {
        self.criteria
            .iter()
            .filter(|criterion| !criterion.has_reference(reference))
            .map(|criterion| criterion.kind())
            .collect()
    }
}

/// What performer candidates are compared against
///
/// Continuous attributes use the mean over the reference pool, set attributes
/// the union. Favorite similarity compares against individual favorites.
#[derive(Debug, Clone)]
pub struct PerformerReference {
    pub now: DateTime<Utc>,
    pub favorites: Vec<PerformerProfile>,
    pub cup_ordinal: Option<f64>,
    pub bmi_cup_ratio: Option<f64>,
    pub height_cup_ratio: Option<f64>,
    pub age: Option<f64>,
    pub tags: BTreeSet<String>,
    pub scene_types: BTreeSet<String>,
    /// Largest scene-type count among the candidates
    pub max_scene_types: usize,
}

impl PerformerReference {
    pub fn build(
        pool: &[&PerformerProfile],
        favorites: &[&PerformerProfile],
        candidates: &[&PerformerProfile],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            now,
            favorites: favorites.iter().map(|p| (*p).clone()).collect(),
            cup_ordinal: mean(pool.iter().filter_map(|p| p.cup_ordinal())),
            bmi_cup_ratio: mean(pool.iter().filter_map(|p| p.bmi_to_cup_ratio())),
            height_cup_ratio: mean(pool.iter().filter_map(|p| p.height_to_cup_ratio())),
            age: mean(pool.iter().filter_map(|p| p.age_at(now))),
            tags: pool.iter().flat_map(|p| p.tags.iter().cloned()).collect(),
            scene_types: pool
                .iter()
                .flat_map(|p| p.scene_types.iter().cloned())
                .collect(),
            max_scene_types: candidates
                .iter()
                .map(|p| p.scene_types.len())
                .max()
                .unwrap_or(0),
        }
    }
}

/// Preference profile derived from the scenes the user engaged with
#[derive(Debug, Clone)]
pub struct SceneReference {
    pub now: DateTime<Utc>,
    pub preferred_tags: BTreeSet<String>,
    pub preferred_studios: BTreeSet<String>,
    pub favorite_performer_ids: BTreeSet<String>,
}

impl SceneReference {
    /// A scene shapes the profile when it is a favorite, was played often
    /// enough or is rated high enough. Tags and studios must recur across
    /// those scenes to be kept.
    pub fn build(catalog: &Catalog, settings: &SceneSettings, now: DateTime<Utc>) -> Self {
        let preference_scenes: Vec<&SceneRecord> = catalog
            .scenes()
            .iter()
            .filter(|s| {
                s.favorite
                    || s.view_count >= settings.min_plays_for_preference
                    || s.rating
                        .is_some_and(|r| r >= settings.min_rating_for_preference)
            })
            .collect();

        let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut studio_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for scene in &preference_scenes {
            for tag in &scene.tags {
                *tag_counts.entry(tag.as_str()).or_default() += 1;
            }
            if let Some(studio) = &scene.studio_id {
                *studio_counts.entry(studio.as_str()).or_default() += 1;
            }
        }

        let recurring = |counts: BTreeMap<&str, usize>| -> BTreeSet<String> {
            counts
                .into_iter()
                .filter(|(_, n)| *n >= settings.min_preference_occurrence)
                .map(|(name, _)| name.to_string())
                .collect()
        };

        let reference = Self {
            now,
            preferred_tags: recurring(tag_counts),
            preferred_studios: recurring(studio_counts),
            favorite_performer_ids: catalog.favorite_performer_ids().clone(),
        };

        tracing::debug!(
            preference_scenes = preference_scenes.len(),
            tags = reference.preferred_tags.len(),
            studios = reference.preferred_studios.len(),
            "Scene preference profile built"
        );

        reference
    }
}

/// Continuous attribute compared against the pool mean
pub struct ContinuousCriterion {
    kind: CriterionKind,
    tolerance: f64,
    value: fn(&PerformerProfile, DateTime<Utc>) -> Option<f64>,
    reference: fn(&PerformerReference) -> Option<f64>,
}

impl ContinuousCriterion {
    pub fn cup_size(tolerance: f64) -> Self {
        Self {
            kind: CriterionKind::CupSize,
            tolerance,
            value: |p, _| p.cup_ordinal(),
            reference: |r| r.cup_ordinal,
        }
    }

    pub fn bmi_cup_ratio(tolerance: f64) -> Self {
        Self {
            kind: CriterionKind::BmiCupRatio,
            tolerance,
            value: |p, _| p.bmi_to_cup_ratio(),
            reference: |r| r.bmi_cup_ratio,
        }
    }

    pub fn height_cup_ratio(tolerance: f64) -> Self {
        Self {
            kind: CriterionKind::HeightCupRatio,
            tolerance,
            value: |p, _| p.height_to_cup_ratio(),
            reference: |r| r.height_cup_ratio,
        }
    }

    pub fn age(tolerance: f64) -> Self {
        Self {
            kind: CriterionKind::AgeRange,
            tolerance,
            value: |p, now| p.age_at(now),
            reference: |r| r.age,
        }
    }
}

impl Criterion<PerformerProfile, PerformerReference> for ContinuousCriterion {
    fn kind(&self) -> CriterionKind {
        self.kind
    }

    fn score(&self, candidate: &PerformerProfile, reference: &PerformerReference) -> Option<f64> {
        let value = (self.value)(candidate, reference.now)?;
        let target = (self.reference)(reference)?;
        Some(continuous_similarity(value, target, self.tolerance))
    }

    fn has_reference(&self, reference: &PerformerReference) -> bool {
        (self.reference)(reference).is_some()
    }
}

fn tags(p: &PerformerProfile) -> &BTreeSet<String> {
    &p.tags
}

fn scene_types(p: &PerformerProfile) -> &BTreeSet<String> {
    &p.scene_types
}

fn reference_tags(r: &PerformerReference) -> &BTreeSet<String> {
    &r.tags
}

fn reference_scene_types(r: &PerformerReference) -> &BTreeSet<String> {
    &r.scene_types
}

/// Set attribute compared against the pool union
pub struct SetCriterion {
    kind: CriterionKind,
    value: fn(&PerformerProfile) -> &BTreeSet<String>,
    reference: fn(&PerformerReference) -> &BTreeSet<String>,
}

impl SetCriterion {
    pub fn tags() -> Self {
        Self {
            kind: CriterionKind::TagSimilarity,
            value: tags,
            reference: reference_tags,
        }
    }

    pub fn scene_types() -> Self {
        Self {
            kind: CriterionKind::SceneTypes,
            value: scene_types,
            reference: reference_scene_types,
        }
    }
}

impl Criterion<PerformerProfile, PerformerReference> for SetCriterion {
    fn kind(&self) -> CriterionKind {
        self.kind
    }

    fn score(&self, candidate: &PerformerProfile, reference: &PerformerReference) -> Option<f64> {
        jaccard((self.value)(candidate), (self.reference)(reference))
    }

    fn has_reference(&self, reference: &PerformerReference) -> bool {
        !(self.reference)(reference).is_empty()
    }
}

/// Recency of the catalog entry
pub struct NoveltyCriterion {
    timeframe_days: u32,
}

impl NoveltyCriterion {
    pub fn new(timeframe_days: u32) -> Self {
        Self { timeframe_days }
    }
}

impl Criterion<PerformerProfile, PerformerReference> for NoveltyCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Novelty
    }

    fn score(&self, candidate: &PerformerProfile, reference: &PerformerReference) -> Option<f64> {
        let created_at = candidate.created_at?;
        Some(recency(created_at, reference.now, self.timeframe_days))
    }
}

impl Criterion<SceneRecord, SceneReference> for NoveltyCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Novelty
    }

    fn score(&self, candidate: &SceneRecord, reference: &SceneReference) -> Option<f64> {
        let created_at = candidate.created_at?;
        Some(recency(created_at, reference.now, self.timeframe_days))
    }
}

/// Rating rescaled to `[0, 1]`
pub struct QualityCriterion {
    rating_scale: f64,
}

impl QualityCriterion {
    pub fn new(rating_scale: f64) -> Self {
        Self { rating_scale }
    }
}

impl Criterion<PerformerProfile, PerformerReference> for QualityCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::SceneQuality
    }

    fn score(&self, candidate: &PerformerProfile, _reference: &PerformerReference) -> Option<f64> {
        candidate.rating.map(|r| rating_quality(r, self.rating_scale))
    }
}

impl Criterion<SceneRecord, SceneReference> for QualityCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::SceneQuality
    }

    fn score(&self, candidate: &SceneRecord, _reference: &SceneReference) -> Option<f64> {
        candidate.rating.map(|r| rating_quality(r, self.rating_scale))
    }
}

/// Scene-type breadth relative to the broadest candidate
pub struct VersatilityCriterion;

impl Criterion<PerformerProfile, PerformerReference> for VersatilityCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::Versatility
    }

    fn score(&self, candidate: &PerformerProfile, reference: &PerformerReference) -> Option<f64> {
        if candidate.scene_types.is_empty() || reference.max_scene_types == 0 {
            return None;
        }
        Some(candidate.scene_types.len() as f64 / reference.max_scene_types as f64)
    }

    fn has_reference(&self, reference: &PerformerReference) -> bool {
        reference.max_scene_types > 0
    }
}

/// Similarity to the nearest favorite
///
/// Favorites are pre-filtered to those within the cup tolerance of the
/// candidate; when none qualify (or the candidate has no cup size) all
/// favorites are considered. The score is the best profile similarity found.
pub struct FavoriteSimilarityCriterion {
    pub cup_tolerance: Option<f64>,
    pub bmi_cup_tolerance: Option<f64>,
    pub height_cup_tolerance: Option<f64>,
    pub age_tolerance: Option<f64>,
}

impl FavoriteSimilarityCriterion {
    fn nearby<'a>(
        &self,
        candidate: &PerformerProfile,
        favorites: &'a [PerformerProfile],
    ) -> Vec<&'a PerformerProfile> {
        let nearby: Vec<&PerformerProfile> = match (candidate.cup_ordinal(), self.cup_tolerance) {
            (Some(cup), Some(tolerance)) => favorites
                .iter()
                .filter(|f| {
                    f.cup_ordinal()
                        .is_some_and(|other| (other - cup).abs() <= tolerance)
                })
                .collect(),
            _ => Vec::new(),
        };

        if nearby.is_empty() {
            favorites.iter().collect()
        } else {
            nearby
        }
    }

    /// Mean of the attribute similarities both profiles define
    pub fn profile_similarity(
        &self,
        candidate: &PerformerProfile,
        favorite: &PerformerProfile,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        let pairs = [
            (self.cup_tolerance, candidate.cup_ordinal(), favorite.cup_ordinal()),
            (
                self.bmi_cup_tolerance,
                candidate.bmi_to_cup_ratio(),
                favorite.bmi_to_cup_ratio(),
            ),
            (
                self.height_cup_tolerance,
                candidate.height_to_cup_ratio(),
                favorite.height_to_cup_ratio(),
            ),
            (self.age_tolerance, candidate.age_at(now), favorite.age_at(now)),
        ];

        let components = pairs
            .into_iter()
            .filter_map(|pair| match pair {
                (Some(tolerance), Some(a), Some(b)) => Some(continuous_similarity(a, b, tolerance)),
                _ => None,
            })
            .chain(jaccard(&candidate.tags, &favorite.tags));

        mean(components)
    }
}

impl Criterion<PerformerProfile, PerformerReference> for FavoriteSimilarityCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::FavoriteSimilarity
    }

    fn score(&self, candidate: &PerformerProfile, reference: &PerformerReference) -> Option<f64> {
        self.nearby(candidate, &reference.favorites)
            .into_iter()
            .filter_map(|favorite| self.profile_similarity(candidate, favorite, reference.now))
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
    }

    fn has_reference(&self, reference: &PerformerReference) -> bool {
        !reference.favorites.is_empty()
    }
}

/// Scene tags compared against the preferred tags
pub struct PreferenceTagCriterion;

impl Criterion<SceneRecord, SceneReference> for PreferenceTagCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::TagSimilarity
    }

    fn score(&self, candidate: &SceneRecord, reference: &SceneReference) -> Option<f64> {
        jaccard(&candidate.tags, &reference.preferred_tags)
    }

    fn has_reference(&self, reference: &SceneReference) -> bool {
        !reference.preferred_tags.is_empty()
    }
}

/// 1.0 when any favorite performer appears in the scene
pub struct PerformerMatchCriterion;

impl Criterion<SceneRecord, SceneReference> for PerformerMatchCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::PerformerMatch
    }

    fn score(&self, candidate: &SceneRecord, reference: &SceneReference) -> Option<f64> {
        if reference.favorite_performer_ids.is_empty() {
            return None;
        }
        Some(if candidate.has_any_performer(&reference.favorite_performer_ids) {
            1.0
        } else {
            0.0
        })
    }

    fn has_reference(&self, reference: &SceneReference) -> bool {
        !reference.favorite_performer_ids.is_empty()
    }
}

/// 1.0 when the scene comes from a preferred studio
pub struct StudioMatchCriterion;

impl Criterion<SceneRecord, SceneReference> for StudioMatchCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::StudioMatch
    }

    fn score(&self, candidate: &SceneRecord, reference: &SceneReference) -> Option<f64> {
        let studio = candidate.studio_id.as_ref()?;
        if reference.preferred_studios.is_empty() {
            return None;
        }
        Some(if reference.preferred_studios.contains(studio) {
            1.0
        } else {
            0.0
        })
    }

    fn has_reference(&self, reference: &SceneReference) -> bool {
        !reference.preferred_studios.is_empty()
    }
}

/// Favors scenes that were rarely played
pub struct LowViewCountCriterion;

impl Criterion<SceneRecord, SceneReference> for LowViewCountCriterion {
    fn kind(&self) -> CriterionKind {
        CriterionKind::LowViewCount
    }

    fn score(&self, candidate: &SceneRecord, _reference: &SceneReference) -> Option<f64> {
        Some(1.0 / (1.0 + f64::from(candidate.view_count)))
    }
}

fn tolerance(value: Option<f64>, name: &str) -> AppResult<f64> {
    let value = value.ok_or_else(|| AppError::Configuration(format!("{} is required", name)))?;
    positive(value, name)
}

fn positive(value: f64, name: &str) -> AppResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AppError::Configuration(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

fn timeframe(value: Option<u32>) -> AppResult<u32> {
    match value {
        Some(days) if days > 0 => Ok(days),
        Some(_) => Err(AppError::Configuration(
            "novelty_timeframe_days must be positive".to_string(),
        )),
        None => Err(AppError::Configuration(
            "novelty_timeframe_days is required".to_string(),
        )),
    }
}

fn required<T>(value: Option<T>, name: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Configuration(format!("{} is required", name)))
}

/// Builds the enabled performer criteria, checking their parameters
pub fn performer_criteria(
    settings: &PerformerSettings,
) -> AppResult<CriterionSet<PerformerProfile, PerformerReference>> {
    let mut set = CriterionSet::new();

    if settings.enable_cup_size {
        let t = tolerance(settings.cup_size_tolerance, "cup_size_tolerance")?;
        set.push(ContinuousCriterion::cup_size(t), settings.weight_cup_size);
    }
    if settings.enable_bmi_cup_ratio {
        let t = tolerance(settings.bmi_cup_tolerance, "bmi_cup_tolerance")?;
        set.push(ContinuousCriterion::bmi_cup_ratio(t), settings.weight_bmi_cup_ratio);
    }
    if settings.enable_height_cup_ratio {
        let t = tolerance(settings.height_cup_tolerance, "height_cup_tolerance")?;
        set.push(
            ContinuousCriterion::height_cup_ratio(t),
            settings.weight_height_cup_ratio,
        );
    }
    if settings.enable_tag_similarity {
        set.push(SetCriterion::tags(), settings.weight_tag_similarity);
    }
    if settings.enable_scene_types {
        set.push(SetCriterion::scene_types(), settings.weight_scene_types);
    }
    if settings.enable_age_range {
        let t = tolerance(settings.age_range_tolerance, "age_range_tolerance")?;
        set.push(ContinuousCriterion::age(t), settings.weight_age_similarity);
    }
    if settings.enable_novelty {
        let days = timeframe(settings.novelty_timeframe_days)?;
        set.push(NoveltyCriterion::new(days), settings.weight_novelty);
    }
    if settings.enable_scene_quality {
        required(settings.min_scene_rating, "min_scene_rating")?;
        let scale = positive(settings.rating_scale, "rating_scale")?;
        set.push(QualityCriterion::new(scale), settings.weight_scene_quality);
    }
    if settings.enable_versatility {
        set.push(VersatilityCriterion, settings.weight_versatility);
    }
    if settings.enable_similar_to_favorites {
        required(
            settings.favorite_similarity_threshold,
            "favorite_similarity_threshold",
        )?;
        set.push(
            FavoriteSimilarityCriterion {
                cup_tolerance: settings.cup_size_tolerance,
                bmi_cup_tolerance: settings.bmi_cup_tolerance,
                height_cup_tolerance: settings.height_cup_tolerance,
                age_tolerance: settings.age_range_tolerance,
            },
            settings.weight_favorite_similarity,
        );
    }

    Ok(set)
}

/// Builds the enabled scene criteria, checking their parameters
pub fn scene_criteria(settings: &SceneSettings) -> AppResult<CriterionSet<SceneRecord, SceneReference>> {
    let mut set = CriterionSet::new();

    if settings.enable_tag_similarity {
        set.push(PreferenceTagCriterion, settings.weight_tag_similarity);
    }
    if settings.enable_performer_match {
        set.push(PerformerMatchCriterion, settings.weight_performer_match);
    }
    if settings.enable_studio_match {
        set.push(StudioMatchCriterion, settings.weight_studio_match);
    }
    if settings.enable_high_quality {
        required(settings.min_scene_rating, "min_scene_rating")?;
        let scale = positive(settings.rating_scale, "rating_scale")?;
        set.push(QualityCriterion::new(scale), settings.weight_high_quality);
    }
    if settings.enable_novelty {
        let days = timeframe(settings.novelty_timeframe_days)?;
        set.push(NoveltyCriterion::new(days), settings.weight_novelty);
    }
    if settings.enable_low_view_count {
        set.push(LowViewCountCriterion, settings.weight_low_view_count);
    }

    Ok(set)
}
