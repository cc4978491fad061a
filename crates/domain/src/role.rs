use std::collections::BTreeSet;

use aclgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ResourceRef, ResourceType};

/// Stable identifier of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Operations a role grants on the resources it is assigned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows reading the resource.
    Read,
    /// Allows editing the resource.
    Update,
    /// Allows deleting the resource.
    Delete,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Named permission bundle scoped to one resource type.
///
/// Roles are immutable once referenced by an assignment; renames happen
/// outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    role_id: RoleId,
    name: NonEmptyString,
    resource_type: ResourceType,
    permissions: BTreeSet<Permission>,
}

impl Role {
    /// Creates a validated role definition.
    pub fn new(
        role_id: RoleId,
        name: impl Into<String>,
        resource_type: ResourceType,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim() != name {
            return Err(AppError::Validation(format!(
                "role name '{name}' must not have leading or trailing whitespace"
            )));
        }

        Ok(Self {
            role_id,
            name: NonEmptyString::new(name)?,
            resource_type,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Returns the stable role identifier.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the role name, unique within its resource type.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the resource type the role applies to.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the permissions granted by the role.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// Returns whether the role grants the permission.
    #[must_use]
    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Returns whether the role may be assigned on the resource.
    #[must_use]
    pub fn applies_to(&self, resource: &ResourceRef) -> bool {
        resource.resource_type() == &self.resource_type
    }
}
