//! Shared primitives for all Rust crates in aclgate.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across aclgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
///
/// The four access-control kinds (`RoleNotFound`, `DuplicateAssignment`,
/// `AssignmentNotFound`, `InconsistentMembership`) are raised by the
/// assignment engine itself; the rest are shared with adapters and callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Role name is not registered for the resource type.
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// Add would create a second grant for an existing triple.
    #[error("duplicate assignment: {0}")]
    DuplicateAssignment(String),

    /// Remove targeted a triple that has no grant.
    #[error("assignment not found: {0}")]
    AssignmentNotFound(String),

    /// A current grantee could not be resolved by its natural key.
    #[error("inconsistent membership: {0}")]
    InconsistentMembership(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP-equivalent status code a request layer should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::RoleNotFound(_) | Self::AssignmentNotFound(_) => 404,
            Self::Conflict(_) | Self::DuplicateAssignment(_) => 409,
            Self::InconsistentMembership(_) | Self::Internal(_) => 500,
        }
    }
}
