use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::{BraSize, PerformerProfile, SceneRecord};

/// Raw data handed over by the profile store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub performers: Vec<PerformerProfile>,
    #[serde(default)]
    pub scenes: Vec<SceneRecord>,
    /// Favorites known to the store in addition to the flags on the profiles
    #[serde(default)]
    pub favorite_performer_ids: BTreeSet<String>,
}

/// A record dropped while building the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogProblem {
    DuplicatePerformer(String),
    DuplicateScene(String),
    InvalidPerformer(String),
    InvalidScene(String),
    /// Kept, but the measurements string gave no bra size
    UnparsedMeasurements(String),
}

impl CatalogProblem {
    /// Whether the offending record was left out of the catalog
    pub fn is_dropped(&self) -> bool {
        !matches!(self, CatalogProblem::UnparsedMeasurements(_))
    }
}

/// Validated, read-only view of one snapshot
#[derive(Debug, Clone)]
pub struct Catalog {
    performers: Vec<PerformerProfile>,
    scenes: Vec<SceneRecord>,
    favorite_performer_ids: BTreeSet<String>,
    performer_index: HashMap<String, usize>,
    scene_index: HashMap<String, usize>,
}

pub struct CatalogBuildResult {
    pub catalog: Catalog,
    pub problems: Vec<CatalogProblem>,
}

impl Catalog {
    /// Builds a catalog, dropping records that break invariants
    ///
    /// The first occurrence of a duplicated id wins.
    pub fn build(snapshot: CatalogSnapshot, rating_scale: f64) -> CatalogBuildResult {
        let mut problems = Vec::new();

        let mut performers = Vec::with_capacity(snapshot.performers.len());
        let mut performer_index = HashMap::new();
        for mut performer in snapshot.performers {
            if let Err(e) = performer.validate(rating_scale) {
                problems.push(CatalogProblem::InvalidPerformer(e.to_string()));
                continue;
            }
            if performer_index.contains_key(&performer.id) {
                problems.push(CatalogProblem::DuplicatePerformer(performer.id));
                continue;
            }
            if performer.bra_size.is_none() {
                if let Some(measurements) = performer.measurements.as_deref() {
                    match BraSize::from_measurements(measurements) {
                        Ok(size) => performer.bra_size = Some(size),
                        Err(e) => problems.push(CatalogProblem::UnparsedMeasurements(format!(
                            "Performer {}: {}",
                            performer.id, e
                        ))),
                    }
                }
            }
            performer_index.insert(performer.id.clone(), performers.len());
            performers.push(performer);
        }

        let mut scenes = Vec::with_capacity(snapshot.scenes.len());
        let mut scene_index = HashMap::new();
        for scene in snapshot.scenes {
            if let Err(e) = scene.validate(rating_scale) {
                problems.push(CatalogProblem::InvalidScene(e.to_string()));
                continue;
            }
            if scene_index.contains_key(&scene.id) {
                problems.push(CatalogProblem::DuplicateScene(scene.id));
                continue;
            }
            scene_index.insert(scene.id.clone(), scenes.len());
            scenes.push(scene);
        }

        let mut favorite_performer_ids = snapshot.favorite_performer_ids;
        favorite_performer_ids.extend(
            performers
                .iter()
                .filter(|p| p.favorite)
                .map(|p| p.id.clone()),
        );

        for problem in &problems {
            if problem.is_dropped() {
                tracing::warn!(problem = ?problem, "Dropped catalog record");
            } else {
                tracing::warn!(problem = ?problem, "Catalog record kept with missing attributes");
            }
        }

        tracing::info!(
            performers = performers.len(),
            scenes = scenes.len(),
            favorites = favorite_performer_ids.len(),
            problems = problems.len(),
            "Catalog built"
        );

        CatalogBuildResult {
            catalog: Catalog {
                performers,
                scenes,
                favorite_performer_ids,
                performer_index,
                scene_index,
            },
            problems,
        }
    }

    pub fn performers(&self) -> &[PerformerProfile] {
        &self.performers
    }

    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    pub fn favorite_performer_ids(&self) -> &BTreeSet<String> {
        &self.favorite_performer_ids
    }

    pub fn performer(&self, id: &str) -> Option<&PerformerProfile> {
        self.performer_index.get(id).map(|&i| &self.performers[i])
    }

    pub fn scene(&self, id: &str) -> Option<&SceneRecord> {
        self.scene_index.get(id).map(|&i| &self.scenes[i])
    }

    /// Favorite profiles present in the catalog, in catalog order
    pub fn favorite_performers(&self) -> Vec<&PerformerProfile> {
        self.performers
            .iter()
            .filter(|p| self.favorite_performer_ids.contains(&p.id))
            .collect()
    }
}
