use async_trait::async_trait;

use aclgate_core::AppResult;
use aclgate_domain::{
    Assignment, MembershipPlan, Principal, PrincipalId, ResourceRef, Role, RoleId,
};

use super::predicates::OverduePredicate;

/// Repository port owning the set of (resource, role, principal) grants.
///
/// Implementations enforce at most one assignment per triple and keep the
/// insertion order of each (resource, role) membership for listing.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Grants the role to the principal on the resource.
    ///
    /// Fails with `DuplicateAssignment` when the triple already exists and with
    /// `Validation` when the role does not apply to the resource type.
    async fn add(
        &self,
        resource: &ResourceRef,
        role: &Role,
        principal: &Principal,
    ) -> AppResult<Assignment>;

    /// Revokes the grant for the triple.
    ///
    /// Fails with `AssignmentNotFound` when no such grant exists.
    async fn remove(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
        principal_id: PrincipalId,
    ) -> AppResult<()>;

    /// Lists the grants of one role on one resource in insertion order.
    async fn list_assignments(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
    ) -> AppResult<Vec<Assignment>>;

    /// Lists resources on which the principal holds any of the roles.
    async fn list_resources_for_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<ResourceRef>>;

    /// Locks one (resource, role) membership for a read-plan-commit cycle.
    ///
    /// Edits on the same pair are serialized; edits on different pairs do not
    /// wait on each other. Dropping the edit without committing leaves the
    /// store untouched.
    async fn begin_membership_edit(
        &self,
        resource: &ResourceRef,
        role: &Role,
    ) -> AppResult<Box<dyn MembershipEdit>>;

    /// Lists current grantees of one role on one resource in insertion order.
    async fn list_principals(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
    ) -> AppResult<Vec<Principal>> {
        Ok(self
            .list_assignments(resource, role_id)
            .await?
            .into_iter()
            .map(|assignment| assignment.principal().clone())
            .collect())
    }

    /// Returns the grant for the exact triple, if any.
    async fn find_assignment(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
        principal_id: PrincipalId,
    ) -> AppResult<Option<Assignment>> {
        Ok(self
            .list_assignments(resource, role_id)
            .await?
            .into_iter()
            .find(|assignment| assignment.principal().principal_id() == principal_id))
    }

    /// Lists resources on which the principal holds any of the roles, each
    /// paired with the caller's overdue classification.
    async fn list_assignments_for_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
        predicate: &dyn OverduePredicate,
    ) -> AppResult<Vec<(ResourceRef, bool)>> {
        Ok(self
            .list_resources_for_principal(principal_id, role_ids)
            .await?
            .into_iter()
            .map(|resource| {
                let overdue = predicate.is_overdue(&resource);
                (resource, overdue)
            })
            .collect())
    }
}

/// An open, exclusive edit of one (resource, role) membership.
///
/// Concurrent readers keep seeing the membership as it was when the edit
/// began until [`MembershipEdit::commit`] returns.
#[async_trait]
pub trait MembershipEdit: Send {
    /// Returns the grants that existed when the edit began, in insertion order.
    fn current(&self) -> &[Assignment];

    /// Applies every add and remove of the plan as one atomic change.
    ///
    /// On error no part of the plan is visible to readers.
    async fn commit(self: Box<Self>, plan: &MembershipPlan) -> AppResult<Vec<Assignment>>;
}
