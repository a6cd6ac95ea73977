use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LibraryError {
    pub(crate) fn out_of_range(field: &str, value: impl Into<i64>, min: i64, max: i64) -> Self {
        LibraryError::OutOfRange {
            field: field.to_string(),
            value: value.into(),
            min,
            max,
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
