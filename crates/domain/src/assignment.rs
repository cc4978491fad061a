use aclgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Principal, PrincipalId, ResourceRef, Role, RoleId};

/// Stable identifier of one grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
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

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A single (resource, role, principal) grant.
///
/// Assignments are never mutated in place; a change of role or principal is a
/// remove followed by an add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    assignment_id: AssignmentId,
    resource: ResourceRef,
    role_id: RoleId,
    principal: Principal,
}

impl Assignment {
    /// Creates a new grant, checking that the role applies to the resource type.
    pub fn new(resource: ResourceRef, role: &Role, principal: Principal) -> AppResult<Self> {
        if !role.applies_to(&resource) {
            return Err(AppError::Validation(format!(
                "role '{}' applies to '{}' and cannot be assigned on '{}'",
                role.name(),
                role.resource_type(),
                resource
            )));
        }

        Ok(Self {
            assignment_id: AssignmentId::new(),
            resource,
            role_id: role.role_id(),
            principal,
        })
    }

    /// Rebuilds a grant loaded from storage.
    #[must_use]
    pub fn restore(
        assignment_id: AssignmentId,
        resource: ResourceRef,
        role_id: RoleId,
        principal: Principal,
    ) -> Self {
        Self {
            assignment_id,
            resource,
            role_id,
            principal,
        }
    }

    /// Returns the grant identifier.
    #[must_use]
    pub fn assignment_id(&self) -> AssignmentId {
        self.assignment_id
    }

    /// Returns the resource the grant is on.
    #[must_use]
    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Returns the granted role.
    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Returns the grantee as recorded when the grant was made.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns whether the grant is for exactly this triple.
    #[must_use]
    pub fn matches(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
        principal_id: PrincipalId,
    ) -> bool {
        self.role_id == role_id
            && self.principal.principal_id() == principal_id
            && &self.resource == resource
    }
}

#[cfg(test)]
mod tests {
    use aclgate_core::AppError;

    use crate::{
        EmailAddress, Permission, Principal, PrincipalId, ResourceRef, ResourceType, Role, RoleId,
    };

    use super::Assignment;

    fn alice() -> Principal {
        Principal::new(
            PrincipalId::new(),
            EmailAddress::new("alice@example.com").unwrap_or_else(|_| unreachable!()),
        )
    }

    #[test]
    fn assignment_rejects_role_from_other_resource_type() {
        let role = Role::new(
            RoleId::new(),
            "Admin",
            ResourceType::new("Program").unwrap_or_else(|_| unreachable!()),
            [Permission::Read],
        )
        .unwrap_or_else(|_| unreachable!());
        let audit = ResourceRef::new("Audit", "7").unwrap_or_else(|_| unreachable!());

        let result = Assignment::new(audit, &role, alice());

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn assignment_matches_its_triple() {
        let role = Role::new(
            RoleId::new(),
            "Admin",
            ResourceType::new("Program").unwrap_or_else(|_| unreachable!()),
            [Permission::Read],
        )
        .unwrap_or_else(|_| unreachable!());
        let program = ResourceRef::new("Program", "7").unwrap_or_else(|_| unreachable!());
        let alice = alice();

        let assignment = Assignment::new(program.clone(), &role, alice.clone())
            .unwrap_or_else(|_| unreachable!());

        assert!(assignment.matches(&program, role.role_id(), alice.principal_id()));
        assert!(!assignment.matches(&program, RoleId::new(), alice.principal_id()));
    }
}
