/// Profile store abstraction
///
/// The engine only needs a fully materialized snapshot of the catalog. Where it
/// comes from (an exported file, a live catalog API) is up to the source.
use crate::{error::AppResult, models::CatalogSnapshot};

pub mod json_file;

pub use json_file::{write_recommendations, JsonFileSource};

/// Trait for profile sources
///
/// A source returns everything one batch run needs in a single call; the
/// engine performs no further I/O while scoring.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    /// Load performers, scenes and the favorite set
    async fn load_snapshot(&self) -> AppResult<CatalogSnapshot>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}
