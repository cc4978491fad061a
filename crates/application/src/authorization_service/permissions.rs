use aclgate_domain::{Permission, PrincipalContext};

use super::*;

impl AuthorizationService {
    /// Ensures the actor holds a role granting the permission on the resource.
    pub async fn require_permission(
        &self,
        actor: &PrincipalContext,
        resource: &ResourceRef,
        permission: Permission,
    ) -> AppResult<()> {
        if self
            .has_permission(actor.principal_id(), resource, permission)
            .await?
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "principal '{}' is missing permission '{}' on '{resource}'",
            actor.principal(),
            permission.as_str()
        )))
    }

    /// Returns whether any role the principal holds on the resource grants the
    /// permission.
    pub async fn has_permission(
        &self,
        principal_id: PrincipalId,
        resource: &ResourceRef,
        permission: Permission,
    ) -> AppResult<bool> {
        for role in self.catalog.roles_for_type(resource.resource_type()) {
            if !role.grants(permission) {
                continue;
            }

            if self
                .store
                .find_assignment(resource, role.role_id(), principal_id)
                .await?
                .is_some()
            {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
