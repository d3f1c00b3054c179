use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayoffError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Invalid decimal value '{value}'")]
    InvalidDecimal { value: String },

    #[error("Card '{card_id}' not found")]
    CardNotFound { card_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PayoffError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field, reason: reason.into() }
    }
}

pub type PayoffResult<T> = Result<T, PayoffError>;
