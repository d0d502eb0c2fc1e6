//! Domain error types.

use serde::Serialize;
use thiserror::Error;

/// A single rule broken by an input, located by its JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Path to the offending field, e.g. `ingredients[1].quantity`.
    /// Empty when the input as a whole is malformed.
    pub path: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// An input was rejected. Carries every violation found, never just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", summary(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// A rejection with one violation.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldViolation::new(path, message)])
    }

    /// Returns true if a violation was reported for `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn summary(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
