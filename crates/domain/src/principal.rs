//! Principal identity types.
//!
//! A principal is compared by its stable identifier. The normalised email is
//! its natural key, used when a membership must be matched across an identity
//! boundary (for example a person referenced by email before an id is known).

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use aclgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    /// Creates a new random principal identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a principal identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated, normalised email address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// The value is trimmed and lower-cased. Structural checks only: exactly
    /// one `@`, non-empty local part, and a domain containing a `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AppError::Validation(format!(
                "email address '{normalized}' must contain '@'"
            )));
        };

        if local.is_empty() || domain.contains('@') {
            return Err(AppError::Validation(format!(
                "email address '{normalized}' must have exactly one '@' and a local part"
            )));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(format!(
                "email domain in '{normalized}' must contain at least one '.'"
            )));
        }

        if normalized.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalised email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identity that can be granted roles.
///
/// Equality, ordering, and hashing use [`PrincipalId`] only, so two snapshots
/// of the same person with different emails are the same principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    principal_id: PrincipalId,
    email: EmailAddress,
}

impl Principal {
    /// Creates a principal from its identifier and email.
    #[must_use]
    pub fn new(principal_id: PrincipalId, email: EmailAddress) -> Self {
        Self {
            principal_id,
            email,
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn principal_id(&self) -> PrincipalId {
        self.principal_id
    }

    /// Returns the email natural key.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.principal_id == other.principal_id
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.principal_id.hash(state);
    }
}

impl PartialOrd for Principal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Principal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.principal_id.cmp(&other.principal_id)
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} <{}>", self.principal_id, self.email)
    }
}

/// The authenticated principal a request acts as.
///
/// Established by the request layer and passed explicitly into every
/// authorization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    /// Creates a context for an authenticated principal.
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    /// Returns the acting principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the acting principal's identifier.
    #[must_use]
    pub fn principal_id(&self) -> PrincipalId {
        self.principal.principal_id()
    }
}
