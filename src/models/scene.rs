use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Scene record with its activity statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub performer_ids: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub studio_id: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    /// O-counter
    #[serde(default)]
    pub view_count: u32,
    /// When the scene was added to the catalog
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub favorite: bool,
}

impl SceneRecord {
    pub fn new<I, S>(id: impl Into<String>, performer_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            title: String::new(),
            performer_ids: performer_ids.into_iter().map(Into::into).collect(),
            tags: BTreeSet::new(),
            studio_id: None,
            rating: None,
            view_count: 0,
            created_at: None,
            favorite: false,
        }
    }

    /// Display label, falling back to the id for untitled scenes
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    pub fn has_any_performer(&self, performer_ids: &BTreeSet<String>) -> bool {
        self.performer_ids
            .iter()
            .any(|id| performer_ids.contains(id))
    }

    /// Checks record-level invariants
    pub fn validate(&self, rating_scale: f64) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::Data(format!(
                "Scene {:?} has an empty id",
                self.title
            )));
        }
        if self.performer_ids.is_empty() {
            return Err(AppError::Data(format!(
                "Scene {} has no performers",
                self.id
            )));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=rating_scale).contains(&rating) {
                return Err(AppError::Data(format!(
                    "Scene {} has rating {} outside 0..={}",
                    self.id, rating, rating_scale
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_without_performers_is_invalid() {
        let scene = SceneRecord::new("s1", Vec::<String>::new());
        assert!(matches!(scene.validate(100.0), Err(AppError::Data(_))));
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let mut scene = SceneRecord::new("s1", ["p1"]);
        assert_eq!(scene.label(), "s1");
        scene.title = "Opening".to_string();
        assert_eq!(scene.label(), "Opening");
    }

    #[test]
    fn test_has_any_performer() {
        let scene = SceneRecord::new("s1", ["p1", "p2"]);
        let favorites: BTreeSet<String> = ["p2".to_string()].into_iter().collect();
        assert!(scene.has_any_performer(&favorites));
        assert!(!scene.has_any_performer(&BTreeSet::new()));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let scene: SceneRecord =
            serde_json::from_str(r#"{"id":"s9","performer_ids":["p1"]}"#).unwrap();
        assert_eq!(scene.view_count, 0);
        assert_eq!(scene.rating, None);
        assert!(scene.validate(100.0).is_ok());
    }
}
