pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::{Config, PerformerSettings, SceneSettings};
pub use error::{AppError, AppResult};
