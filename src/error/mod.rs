//! Unified error handling for the rules engine

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised by the storage collaborators and the configuration layer.
///
/// Rule-level misconfiguration (unknown operators, missing action fields) is
/// never surfaced through this type; those resolve to a permissive default
/// inside the evaluator.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short machine-readable label, used as a metrics/log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Database(_) => "database",
            AppError::Serialization(_) => "serialization",
            AppError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Config("DATABASE_URL is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: DATABASE_URL is required"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: AppError = anyhow::anyhow!("Something went wrong").into();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
        assert_eq!(err.kind(), "serialization");
    }

    #[test]
    fn test_database_error_conversion() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), "database");
        assert!(err.to_string().starts_with("Database error"));
    }
}
