use std::collections::BTreeSet;

use crate::{
    config::{PerformerSettings, SceneSettings},
    error::{AppError, AppResult},
    models::{Catalog, Category, CriterionKind, ScoredCandidate},
};

use super::{aggregator::WeightedAggregator, normalizer::rating_quality, ranker::CategoryRule};

/// Parses the configured list of switched-off categories
pub fn disabled_categories(names: &[String]) -> AppResult<BTreeSet<Category>> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<Category>().map_err(AppError::Configuration))
        .collect()
}

/// Key of categories that take every candidate with a positive score
fn positive(kind: CriterionKind) -> impl Fn(&ScoredCandidate) -> Option<f64> + Send + Sync {
    move |c: &ScoredCandidate| c.score(kind).filter(|s| *s > 0.0)
}

fn at_least(kind: CriterionKind, gate: f64) -> impl Fn(&ScoredCandidate) -> Option<f64> + Send + Sync {
    move |c: &ScoredCandidate| c.score(kind).filter(|s| *s >= gate)
}

type BackedRule<'a> = (&'static [CriterionKind], CategoryRule<'a>);

fn backed<'a>(backing: &'static [CriterionKind], rule: CategoryRule<'a>) -> BackedRule<'a> {
    (backing, rule)
}

/// Keeps the rules whose backing criteria are enabled and that are not switched off
///
/// A rule without backing criteria is always active.
fn active<'a>(
    rules: Vec<BackedRule<'a>>,
    aggregator: &WeightedAggregator,
    disabled: &BTreeSet<Category>,
) -> Vec<CategoryRule<'a>> {
    rules
        .into_iter()
        .filter_map(|(backing, rule)| {
            let enabled =
                backing.is_empty() || backing.iter().any(|k| aggregator.weight(*k).is_some());
            if enabled && !disabled.contains(&rule.category()) {
                Some(rule)
            } else {
                tracing::debug!(category = %rule.category(), "Category inactive");
                None
            }
        })
        .collect()
}

/// Category rules for performer recommendations
pub fn performer_rules<'a>(
    settings: &PerformerSettings,
    aggregator: &WeightedAggregator,
    catalog: &'a Catalog,
) -> AppResult<Vec<CategoryRule<'a>>> {
    let disabled = disabled_categories(&settings.disabled_categories)?;
    let quality_gate = settings
        .min_scene_rating
        .map(|r| rating_quality(r, settings.rating_scale))
        .unwrap_or(0.0);
    let favorite_threshold = settings.favorite_similarity_threshold.unwrap_or(0.0);
    let unviewed = move |c: &ScoredCandidate| {
        catalog
            .performer(c.id())
            .is_some_and(|p| p.view_count == 0)
    };

    let mut rules = vec![
        backed(
            &[CriterionKind::CupSize],
            CategoryRule::new(Category::SimilarCupSize, positive(CriterionKind::CupSize)),
        ),
        backed(
            &[CriterionKind::BmiCupRatio, CriterionKind::HeightCupRatio],
            CategoryRule::new(Category::SimilarProportions, |c: &ScoredCandidate| {
                let ratios: Vec<f64> = [CriterionKind::BmiCupRatio, CriterionKind::HeightCupRatio]
                    .into_iter()
                    .filter_map(|k| c.score(k))
                    .collect();
                if ratios.is_empty() {
                    return None;
                }
                Some(ratios.iter().sum::<f64>() / ratios.len() as f64).filter(|s| *s > 0.0)
            }),
        ),
        backed(
            &[CriterionKind::TagSimilarity],
            CategoryRule::new(Category::SimilarTags, positive(CriterionKind::TagSimilarity)),
        ),
        backed(
            &[CriterionKind::SceneTypes],
            CategoryRule::new(
                Category::SimilarSceneTypes,
                positive(CriterionKind::SceneTypes),
            ),
        ),
        backed(
            &[CriterionKind::AgeRange],
            CategoryRule::new(Category::SimilarAge, positive(CriterionKind::AgeRange)),
        ),
        backed(
            &[CriterionKind::SceneQuality],
            CategoryRule::new(
                Category::HighQuality,
                at_least(CriterionKind::SceneQuality, quality_gate),
            ),
        ),
        backed(
            &[CriterionKind::SceneQuality],
            CategoryRule::new(Category::HiddenGems, move |c: &ScoredCandidate| {
                if !unviewed(c) {
                    return None;
                }
                c.score(CriterionKind::SceneQuality)
                    .filter(|q| *q >= quality_gate)
            }),
        ),
        backed(
            &[CriterionKind::Novelty],
            CategoryRule::new(Category::Novelty, positive(CriterionKind::Novelty)),
        ),
        backed(
            &[CriterionKind::Versatility],
            CategoryRule::new(Category::Versatile, positive(CriterionKind::Versatility)),
        ),
        backed(
            &[CriterionKind::FavoriteSimilarity],
            CategoryRule::new(
                Category::SimilarToFavorites,
                at_least(CriterionKind::FavoriteSimilarity, favorite_threshold),
            ),
        ),
    ];

    if settings.include_zero_counter {
        rules.push(backed(
            &[],
            CategoryRule::new(Category::ZeroCounter, move |c: &ScoredCandidate| {
                unviewed(c).then(|| c.composite())
            }),
        ));
    }

    Ok(active(rules, aggregator, &disabled))
}

/// Category rules for scene recommendations
pub fn scene_rules<'a>(
    settings: &SceneSettings,
    aggregator: &WeightedAggregator,
    catalog: &'a Catalog,
) -> AppResult<Vec<CategoryRule<'a>>> {
    let disabled = disabled_categories(&settings.disabled_categories)?;
    let quality_gate = settings
        .min_scene_rating
        .map(|r| rating_quality(r, settings.rating_scale))
        .unwrap_or(0.0);
    let unwatched = move |c: &ScoredCandidate| {
        catalog
            .scene(c.id())
            .is_some_and(|s| s.view_count == 0)
    };

    let rules = vec![
        backed(
            &[CriterionKind::TagSimilarity],
            CategoryRule::new(Category::TagSimilarity, positive(CriterionKind::TagSimilarity)),
        ),
        backed(
            &[CriterionKind::PerformerMatch],
            CategoryRule::new(
                Category::FavoritePerformers,
                at_least(CriterionKind::PerformerMatch, 1.0),
            ),
        ),
        backed(
            &[CriterionKind::StudioMatch],
            CategoryRule::new(
                Category::PreferredStudios,
                at_least(CriterionKind::StudioMatch, 1.0),
            ),
        ),
        backed(
            &[CriterionKind::SceneQuality],
            CategoryRule::new(Category::HighQualityUnwatched, move |c: &ScoredCandidate| {
                if !unwatched(c) {
                    return None;
                }
                c.score(CriterionKind::SceneQuality)
                    .filter(|q| *q >= quality_gate)
            }),
        ),
        backed(
            &[CriterionKind::Novelty],
            CategoryRule::new(Category::NoveltyUnwatched, move |c: &ScoredCandidate| {
                if !unwatched(c) {
                    return None;
                }
                c.score(CriterionKind::Novelty).filter(|s| *s > 0.0)
            }),
        ),
        backed(
            &[CriterionKind::SceneQuality],
            CategoryRule::new(Category::TopUnwatched, move |c: &ScoredCandidate| {
                if !unwatched(c) {
                    return None;
                }
                c.score(CriterionKind::SceneQuality).filter(|q| *q > 0.0)
            }),
        ),
    ];

    Ok(active(rules, aggregator, &disabled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogSnapshot, PerformerProfile, SceneRecord};
    use std::collections::BTreeMap;

    fn catalog() -> Catalog {
        let mut seen = PerformerProfile::new("seen", "Seen");
        seen.view_count = 4;
        let unseen = PerformerProfile::new("unseen", "Unseen");
        Catalog::build(
            CatalogSnapshot {
                performers: vec![seen, unseen],
                ..Default::default()
            },
            100.0,
        )
        .catalog
    }

    fn aggregator(kinds: &[CriterionKind]) -> WeightedAggregator {
        WeightedAggregator::new(kinds.iter().map(|k| (*k, 1.0)).collect()).unwrap()
    }

    fn candidate(id: &str, scores: &[(CriterionKind, f64)]) -> ScoredCandidate {
        let scores: BTreeMap<CriterionKind, f64> = scores.iter().copied().collect();
        ScoredCandidate::new(id.to_string(), id.to_string(), scores, 0.9)
    }

    fn categories(rules: &[CategoryRule<'_>]) -> Vec<Category> {
        rules.iter().map(|r| r.category()).collect()
    }

    #[test]
    fn test_disabled_categories_parse() {
        let names = vec!["zero_counter".to_string(), " ".to_string(), "novelty ".to_string()];
        let disabled = disabled_categories(&names).unwrap();
        assert!(disabled.contains(&Category::ZeroCounter));
        assert!(disabled.contains(&Category::Novelty));

        let unknown = disabled_categories(&["nope".to_string()]);
        assert!(matches!(unknown, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_rules_follow_enabled_criteria() {
        let catalog = catalog();
        let rules = performer_rules(
            &PerformerSettings::default(),
            &aggregator(&[CriterionKind::CupSize, CriterionKind::HeightCupRatio]),
            &catalog,
        )
        .unwrap();

        assert_eq!(
            categories(&rules),
            vec![
                Category::SimilarCupSize,
                Category::SimilarProportions,
                Category::ZeroCounter
            ]
        );
    }

    #[test]
    fn test_disabled_and_zero_counter_switches() {
        let catalog = catalog();
        let settings = PerformerSettings {
            include_zero_counter: false,
            disabled_categories: vec!["similar_cup_size".to_string()],
            ..PerformerSettings::default()
        };
        let rules = performer_rules(
            &settings,
            &aggregator(&[CriterionKind::CupSize, CriterionKind::TagSimilarity]),
            &catalog,
        )
        .unwrap();

        assert_eq!(categories(&rules), vec![Category::SimilarTags]);
    }

    #[test]
    fn test_hidden_gems_need_zero_views_and_quality() {
        let catalog = catalog();
        let rules = performer_rules(
            &PerformerSettings::default(),
            &aggregator(&[CriterionKind::SceneQuality]),
            &catalog,
        )
        .unwrap();
        let gems = rules
            .iter()
            .find(|r| r.category() == Category::HiddenGems)
            .unwrap();

        let unseen_good = candidate("unseen", &[(CriterionKind::SceneQuality, 0.8)]);
        let unseen_poor = candidate("unseen", &[(CriterionKind::SceneQuality, 0.4)]);
        let seen_good = candidate("seen", &[(CriterionKind::SceneQuality, 0.9)]);

        assert_eq!(gems.key(&unseen_good), Some(0.8));
        assert_eq!(gems.key(&unseen_poor), None);
        assert_eq!(gems.key(&seen_good), None);
    }

    #[test]
    fn test_similar_to_favorites_threshold() {
        let catalog = catalog();
        let rules = performer_rules(
            &PerformerSettings::default(),
            &aggregator(&[CriterionKind::FavoriteSimilarity]),
            &catalog,
        )
        .unwrap();
        let similar = rules
            .iter()
            .find(|r| r.category() == Category::SimilarToFavorites)
            .unwrap();

        assert_eq!(
            similar.key(&candidate("seen", &[(CriterionKind::FavoriteSimilarity, 0.7)])),
            Some(0.7)
        );
        assert_eq!(
            similar.key(&candidate("seen", &[(CriterionKind::FavoriteSimilarity, 0.69)])),
            None
        );
    }

    #[test]
    fn test_top_unwatched_skips_unrated_and_watched_scenes() {
        let mut watched = SceneRecord::new("watched", ["p1"]);
        watched.view_count = 2;
        let catalog = Catalog::build(
            CatalogSnapshot {
                scenes: vec![SceneRecord::new("unwatched", ["p1"]), watched],
                ..Default::default()
            },
            100.0,
        )
        .catalog;
        let rules = scene_rules(
            &SceneSettings::default(),
            &aggregator(&[CriterionKind::SceneQuality]),
            &catalog,
        )
        .unwrap();
        let top = rules
            .iter()
            .find(|r| r.category() == Category::TopUnwatched)
            .unwrap();

        let rated = candidate("unwatched", &[(CriterionKind::SceneQuality, 0.6)]);
        let zero = candidate("unwatched", &[(CriterionKind::SceneQuality, 0.0)]);
        let seen = candidate("watched", &[(CriterionKind::SceneQuality, 0.9)]);

        assert_eq!(top.key(&rated), Some(0.6));
        assert_eq!(top.key(&zero), None);
        assert_eq!(top.key(&seen), None);
    }
}
