/// JSON file profile source and result writer
///
/// Reads a catalog snapshot exported by the profile store and writes one
/// result file per recommendation kind. Files are rewritten on every run.
use crate::{
    error::AppResult,
    models::{CatalogSnapshot, Recommendations},
    services::providers::ProfileSource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PERFORMER_RESULTS_FILE: &str = "performer_recommendations.json";
pub const SCENE_RESULTS_FILE: &str = "scene_recommendations.json";

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ProfileSource for JsonFileSource {
    async fn load_snapshot(&self) -> AppResult<CatalogSnapshot> {
        let bytes = tokio::fs::read(&self.path).await?;
        let snapshot: CatalogSnapshot = serde_json::from_slice(&bytes)?;

        tracing::info!(
            path = %self.path.display(),
            performers = snapshot.performers.len(),
            scenes = snapshot.scenes.len(),
            favorites = snapshot.favorite_performer_ids.len(),
            "Loaded catalog snapshot"
        );

        Ok(snapshot)
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

/// Writes the computed lists into `dir`, returning the written paths
///
/// Output of a previous run is replaced, never merged.
pub async fn write_recommendations(
    dir: &Path,
    recommendations: &Recommendations,
) -> AppResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::new();
    if let Some(performers) = &recommendations.performers {
        written.push(write_json(&dir.join(PERFORMER_RESULTS_FILE), performers).await?);
    }
    if let Some(scenes) = &recommendations.scenes {
        written.push(write_json(&dir.join(SCENE_RESULTS_FILE), scenes).await?);
    }

    Ok(written)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<PathBuf> {
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, &json).await?;

    tracing::info!(path = %path.display(), bytes = json.len(), "Wrote recommendations");

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::PerformerProfile;

    #[tokio::test]
    async fn test_load_snapshot_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = CatalogSnapshot {
            performers: vec![PerformerProfile::new("p1", "Ann")],
            scenes: vec![],
            favorite_performer_ids: ["p1".to_string()].into_iter().collect(),
        };
        std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

        let source = JsonFileSource::new(&path);
        let loaded = source.load_snapshot().await.unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(source.name(), "json_file");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join("absent.json"));
        assert!(matches!(source.load_snapshot().await, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{\"performers\": [").unwrap();

        let source = JsonFileSource::new(&path);
        assert!(matches!(
            source.load_snapshot().await,
            Err(AppError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_write_nothing_for_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let written = write_recommendations(
            &out,
            &Recommendations {
                performers: None,
                scenes: None,
            },
        )
        .await
        .unwrap();

        assert!(written.is_empty());
        assert!(out.is_dir());
    }
}
