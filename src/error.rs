//! Error types for the Fantasy Critic rules engine

use thiserror::Error;

#[cfg(test)]
mod tests;

pub type Result<T> = std::result::Result<T, FantasyCriticError>;

#[derive(Error, Debug)]
pub enum FantasyCriticError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config file could not be parsed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("{0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Site is in read-only mode while actions process.")]
    ReadOnly,

    #[error("User ID not provided and {env_var} environment variable not set")]
    MissingUserId { env_var: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FantasyCriticError {
    /// Shorthand for a validation failure with a human-readable message.
    pub fn validation(message: impl Into<String>) -> Self {
        FantasyCriticError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        FantasyCriticError::Forbidden(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        FantasyCriticError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for failures caused by the request rather than the infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FantasyCriticError::Validation(_)
                | FantasyCriticError::Forbidden(_)
                | FantasyCriticError::NotFound { .. }
                | FantasyCriticError::ReadOnly
                | FantasyCriticError::InvalidId(_)
                | FantasyCriticError::InvalidNumber(_)
        )
    }
}
