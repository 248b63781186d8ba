use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::{
    config::{Config, PerformerSettings, SceneSettings},
    error::{AppError, AppResult},
    models::{
        Catalog, CatalogBuildResult, CatalogSnapshot, CriterionKind, PerformerProfile,
        PerformerRecommendations, Recommendations, RunWarning, ScoredCandidate,
        SceneRecommendations,
    },
    services::{
        aggregator::WeightedAggregator,
        assembler::{assemble_performers, assemble_scenes, RunMetadata},
        categories::{performer_rules, scene_rules},
        criteria::{performer_criteria, scene_criteria, PerformerReference, SceneReference},
        providers::ProfileSource,
        ranker::{eligible, RankedPool},
    },
};

/// Which recommendation lists a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RecommendationKind {
    Performers,
    Scenes,
    All,
}

impl RecommendationKind {
    pub fn includes_performers(self) -> bool {
        matches!(self, RecommendationKind::Performers | RecommendationKind::All)
    }

    pub fn includes_scenes(self) -> bool {
        matches!(self, RecommendationKind::Scenes | RecommendationKind::All)
    }
}

fn check_threshold(min_similarity_score: f64) -> AppResult<()> {
    if (0.0..=1.0).contains(&min_similarity_score) {
        Ok(())
    } else {
        Err(AppError::Configuration(format!(
            "min_similarity_score must lie in 0..=1, got {}",
            min_similarity_score
        )))
    }
}

fn empty_reference_warnings(kinds: Vec<CriterionKind>) -> Vec<RunWarning> {
    kinds
        .into_iter()
        .map(|criterion| {
            tracing::warn!(
                criterion = %criterion,
                "No reference data, criterion left out of every composite"
            );
            RunWarning::EmptyReference { criterion }
        })
        .collect()
}

/// Best rated performers, used as reference when there are no favorites
fn fallback_reference(catalog: &Catalog, count: usize) -> Vec<&PerformerProfile> {
    let mut rated: Vec<(f64, &PerformerProfile)> = catalog
        .performers()
        .iter()
        .filter_map(|p| p.rating.map(|r| (r, p)))
        .collect();
    rated.sort_by(|(ra, a), (rb, b)| rb.total_cmp(ra).then_with(|| a.id.cmp(&b.id)));
    rated.into_iter().take(count).map(|(_, p)| p).collect()
}

/// Performer recommendations for one catalog
///
/// `now` is the run timestamp; ages and recency are measured against it and it
/// is stamped on every list, so identical inputs give identical output.
pub fn recommend_performers(
    catalog: &Catalog,
    settings: &PerformerSettings,
    now: DateTime<Utc>,
) -> AppResult<PerformerRecommendations> {
    check_threshold(settings.min_similarity_score)?;
    let criteria = performer_criteria(settings)?;
    let aggregator = WeightedAggregator::new(criteria.weights().clone())?;
    let rules = performer_rules(settings, &aggregator, catalog)?;

    let mut warnings = Vec::new();
    let favorites = catalog.favorite_performers();
    let pool = if favorites.is_empty() {
        let fallback = fallback_reference(catalog, settings.reference_fallback_count);
        if !fallback.is_empty() {
            let reference_ids = fallback.iter().map(|p| p.id.clone()).collect();
            tracing::warn!(
                reference = fallback.len(),
                "No favorites, comparing against top rated performers"
            );
            warnings.push(RunWarning::ReferenceFallback { reference_ids });
        }
        fallback
    } else {
        favorites.clone()
    };

    let excluded = catalog.favorite_performer_ids();
    let candidates = eligible(
        catalog.performers(),
        |p| p.id.as_str(),
        |p| excluded.contains(&p.id) || (!settings.include_zero_counter && p.view_count == 0),
    );

    let reference = PerformerReference::build(&pool, &favorites, &candidates, now);
    warnings.extend(empty_reference_warnings(criteria.without_reference(&reference)));

    let scored: Vec<ScoredCandidate> = candidates
        .par_iter()
        .filter_map(|p| aggregator.aggregate(&p.id, &p.name, criteria.score(p, &reference)))
        .collect();

    let ranked = RankedPool::new(scored, settings.min_similarity_score);
    let selection = ranked.select(
        settings.max_recommendations,
        settings.max_recommendations_per_category,
        &rules,
    );

    tracing::info!(
        candidates = candidates.len(),
        ranked = ranked.len(),
        selected = selection.top.len(),
        categories = selection.by_category.len(),
        warnings = warnings.len(),
        "Performer recommendations computed"
    );

    let metadata = RunMetadata {
        generated_at: now,
        min_similarity_score: settings.min_similarity_score,
        reference_ids: pool.iter().map(|p| p.id.clone()).collect(),
    };

    Ok(assemble_performers(&metadata, selection, warnings))
}

/// Scene recommendations for one catalog
pub fn recommend_scenes(
    catalog: &Catalog,
    settings: &SceneSettings,
    now: DateTime<Utc>,
) -> AppResult<SceneRecommendations> {
    check_threshold(settings.min_similarity_score)?;
    let criteria = scene_criteria(settings)?;
    let aggregator = WeightedAggregator::new(criteria.weights().clone())?;
    let rules = scene_rules(settings, &aggregator, catalog)?;

    let reference = SceneReference::build(catalog, settings, now);
    let warnings = empty_reference_warnings(criteria.without_reference(&reference));

    let candidates = eligible(
        catalog.scenes(),
        |s| s.id.as_str(),
        |s| s.favorite || s.view_count > settings.discovered_view_count,
    );

    let scored: Vec<ScoredCandidate> = candidates
        .par_iter()
        .filter_map(|s| aggregator.aggregate(&s.id, s.label(), criteria.score(s, &reference)))
        .collect();

    let ranked = RankedPool::new(scored, settings.min_similarity_score);
    let selection = ranked.select(
        settings.max_recommendations,
        settings.max_recommendations_per_category,
        &rules,
    );

    let favorites = catalog.favorite_performer_ids();
    let (with_favorites, without_favorites) =
        ranked.partition_top(settings.max_recommendations, |c| {
            catalog
                .scene(c.id())
                .is_some_and(|s| s.has_any_performer(favorites))
        });

    tracing::info!(
        candidates = candidates.len(),
        ranked = ranked.len(),
        selected = selection.top.len(),
        with_favorites = with_favorites.len(),
        without_favorites = without_favorites.len(),
        warnings = warnings.len(),
        "Scene recommendations computed"
    );

    let metadata = RunMetadata {
        generated_at: now,
        min_similarity_score: settings.min_similarity_score,
        reference_ids: favorites.clone(),
    };

    Ok(assemble_scenes(
        &metadata,
        selection,
        with_favorites,
        without_favorites,
        warnings,
    ))
}

/// Builds the catalog from a snapshot and computes the requested lists
pub fn run_batch(
    snapshot: CatalogSnapshot,
    config: &Config,
    kind: RecommendationKind,
    now: DateTime<Utc>,
) -> AppResult<Recommendations> {
    // Records are validated once, against the wider of the two rating scales
    let rating_scale = config.performers.rating_scale.max(config.scenes.rating_scale);
    let CatalogBuildResult { catalog, problems } = Catalog::build(snapshot, rating_scale);
    let dropped_count = problems.iter().filter(|p| p.is_dropped()).count();
    let dropped = (dropped_count > 0).then(|| RunWarning::DroppedRecords {
        count: dropped_count,
    });

    let performers = if kind.includes_performers() {
        let mut output = recommend_performers(&catalog, &config.performers, now)?;
        output.warnings.extend(dropped.clone());
        Some(output)
    } else {
        None
    };

    let scenes = if kind.includes_scenes() {
        let mut output = recommend_scenes(&catalog, &config.scenes, now)?;
        output.warnings.extend(dropped);
        Some(output)
    } else {
        None
    };

    Ok(Recommendations { performers, scenes })
}

/// Loads a snapshot from the source and runs the engine on a blocking worker
///
/// When `run_timeout_secs` is configured the whole run is bounded by it.
#[instrument(skip(source, config), fields(source = source.name()))]
pub async fn get_recommendations(
    source: Arc<dyn ProfileSource>,
    config: Arc<Config>,
    kind: RecommendationKind,
    now: DateTime<Utc>,
) -> AppResult<Recommendations> {
    let snapshot = source.load_snapshot().await?;

    let task_config = Arc::clone(&config);
    let task = tokio::task::spawn_blocking(move || run_batch(snapshot, &task_config, kind, now));

    join_within(task, config.run_timeout_secs.map(Duration::from_secs)).await
}

/// Awaits a blocking engine task, giving up once `limit` has elapsed
///
/// The task is not cancelled on timeout, its result is discarded.
async fn join_within<T>(task: JoinHandle<AppResult<T>>, limit: Option<Duration>) -> AppResult<T> {
    let joined = match limit {
        Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
            tracing::warn!(limit = ?limit, "Recommendation run timed out");
            AppError::Timeout(limit)
        })?,
        None => task.await,
    };

    joined.map_err(|e| AppError::Internal(format!("Recommendation task failed: {}", e)))?
}
