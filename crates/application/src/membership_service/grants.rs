use super::*;

use aclgate_domain::PrincipalId;

impl MembershipService {
    /// Grants the named role to one principal on the resource.
    ///
    /// Fails with `DuplicateAssignment` when the grant already exists; callers
    /// wanting idempotent behaviour check [`MembershipService::list_principals`]
    /// first or use [`MembershipService::reconcile`].
    pub async fn grant(
        &self,
        resource: &ResourceRef,
        role_name: &str,
        principal: &Principal,
    ) -> AppResult<Assignment> {
        let role = self.resolve_role(resource, role_name)?;
        let assignment = self.store.add(resource, role, principal).await?;

        info!(
            resource = %resource,
            role = role.name(),
            principal = %principal,
            "role granted"
        );

        Ok(assignment)
    }

    /// Revokes the named role from one principal on the resource.
    pub async fn revoke(
        &self,
        resource: &ResourceRef,
        role_name: &str,
        principal_id: PrincipalId,
    ) -> AppResult<()> {
        let role = self.resolve_role(resource, role_name)?;
        self.store
            .remove(resource, role.role_id(), principal_id)
            .await?;

        info!(
            resource = %resource,
            role = role.name(),
            principal_id = %principal_id,
            "role revoked"
        );

        Ok(())
    }
}
