use thiserror::Error;

use crate::Table;

/// Errors that can occur when interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The item addressed by an update does not exist.
    #[error("Item not found in {table}: {key}")]
    NotFound { table: Table, key: String },

    /// The condition attached to a put or update did not hold.
    #[error("Condition check failed for {table}/{key}")]
    ConditionFailed { table: Table, key: String },

    /// A document was written without a string `id` attribute.
    #[error("Item written to {0} has no string `id` attribute")]
    MissingKey(Table),

    /// An update expression referenced an unknown placeholder or
    /// applied an arithmetic action to a non-numeric attribute.
    #[error("Invalid update expression: {0}")]
    InvalidExpression(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
