use std::time::Duration;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Recommendation run exceeded {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_the_limit() {
        let err = AppError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Recommendation run exceeded 5s");
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::Configuration("weights sum to 0".to_string());
        assert_eq!(err.to_string(), "Configuration error: weights sum to 0");
    }
}
