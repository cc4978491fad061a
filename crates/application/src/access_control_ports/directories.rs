use async_trait::async_trait;

use aclgate_core::AppResult;
use aclgate_domain::{EmailAddress, Principal, PrincipalId, ResourceRef};

/// Port resolving principals owned by an external identity service.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Returns the principal with the identifier, if it still exists.
    async fn find_by_id(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>>;

    /// Returns the principal registered under the email, if any.
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Principal>>;
}

/// Port answering whether a referenced resource still exists.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Returns whether the resource exists in its owning system.
    async fn resource_exists(&self, resource: &ResourceRef) -> AppResult<bool>;
}
