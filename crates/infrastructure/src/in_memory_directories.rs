use std::collections::{HashMap, HashSet};

use aclgate_application::{PrincipalDirectory, ResourceDirectory};
use aclgate_core::{AppError, AppResult};
use aclgate_domain::{EmailAddress, Principal, PrincipalId, ResourceRef};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory principal directory keyed by id with a unique email index.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalDirectory {
    principals: RwLock<HashMap<PrincipalId, Principal>>,
}

impl InMemoryPrincipalDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or updates a principal.
    ///
    /// Fails with `Conflict` when another principal already uses the email.
    pub async fn upsert(&self, principal: Principal) -> AppResult<()> {
        let mut principals = self.principals.write().await;
        if let Some(owner) = principals.values().find(|existing| {
            existing.email() == principal.email()
                && existing.principal_id() != principal.principal_id()
        }) {
            return Err(AppError::Conflict(format!(
                "email '{}' already belongs to principal '{}'",
                principal.email(),
                owner.principal_id()
            )));
        }

        principals.insert(principal.principal_id(), principal);
        Ok(())
    }

    /// Deletes a principal. Grants referencing it are left in place.
    pub async fn remove(&self, principal_id: PrincipalId) -> bool {
        self.principals.write().await.remove(&principal_id).is_some()
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryPrincipalDirectory {
    async fn find_by_id(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>> {
        Ok(self.principals.read().await.get(&principal_id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Principal>> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .find(|principal| principal.email() == email)
            .cloned())
    }
}

/// Resource directory treating every resource as live unless marked deleted.
#[derive(Debug, Default)]
pub struct InMemoryResourceDirectory {
    deleted: RwLock<HashSet<ResourceRef>>,
}

impl InMemoryResourceDirectory {
    /// Creates a directory in which every resource exists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the owning system deleted the resource.
    pub async fn mark_deleted(&self, resource: ResourceRef) {
        self.deleted.write().await.insert(resource);
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryResourceDirectory {
    async fn resource_exists(&self, resource: &ResourceRef) -> AppResult<bool> {
        Ok(!self.deleted.read().await.contains(resource))
    }
}
