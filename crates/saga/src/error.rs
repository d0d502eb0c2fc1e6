//! Saga error types.

use common::RecordId;
use domain::ValidationError;
use queue::QueueError;
use store::StoreError;
use thiserror::Error;

/// Coarse classification of a failure, deciding how it is surfaced:
/// a 4xx/5xx on the ingress path, a retry or a dead letter on the queue path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input. Never retried.
    Validation,
    /// A referenced record is absent.
    NotFound,
    /// The store or queue call failed.
    Infrastructure,
    /// Anything else.
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Infrastructure => "infrastructure",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur while running a saga stage.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The input failed schema or business validation.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The recipe referenced by an order does not exist.
    #[error("Recipe not found: {0}")]
    RecipeNotFound(RecordId),

    /// The order referenced by a message does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(RecordId),

    /// An ingredient listed by a recipe does not exist.
    #[error("Ingredient not found: {0}")]
    IngredientNotFound(RecordId),

    /// Record store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Queue error.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SagaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SagaError::Validation(_) => ErrorKind::Validation,
            SagaError::RecipeNotFound(_)
            | SagaError::OrderNotFound(_)
            | SagaError::IngredientNotFound(_) => ErrorKind::NotFound,
            SagaError::Store(_) | SagaError::Queue(_) => ErrorKind::Infrastructure,
            SagaError::Serialization(_) => ErrorKind::Unexpected,
        }
    }

    /// Returns false for failures that redelivery would reproduce exactly.
    pub fn is_retryable(&self) -> bool {
        self.kind() != ErrorKind::Validation
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use store::Table;

    #[test]
    fn classifies_errors() {
        let id = RecordId::new();
        assert_eq!(
            SagaError::from(ValidationError::single("x", "Required")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(SagaError::RecipeNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(SagaError::OrderNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(SagaError::IngredientNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            SagaError::from(StoreError::MissingKey(Table::Orders)).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn only_validation_is_final() {
        let id = RecordId::new();
        assert!(!SagaError::from(ValidationError::single("x", "Required")).is_retryable());
        assert!(SagaError::OrderNotFound(id).is_retryable());
        assert!(SagaError::from(StoreError::InvalidExpression("bad".into())).is_retryable());
    }

    #[test]
    fn not_found_messages_name_the_record() {
        let id = RecordId::new();
        assert_eq!(
            SagaError::RecipeNotFound(id).to_string(),
            format!("Recipe not found: {id}")
        );
    }
}
