use std::collections::BTreeSet;
use std::sync::Arc;

use aclgate_core::{AppError, AppResult};
use aclgate_domain::{
    Assignment, EmailAddress, MembershipPlan, NaturalKeyIndex, Principal, ResourceRef, Role,
    plan_membership,
};
use tracing::{debug, info};

use crate::access_control_ports::{
    AssignmentStore, MembershipEdit, PrincipalDirectory, ResourceDirectory,
};
use crate::role_catalog::RoleCatalog;

mod audit;
mod bulk_edit;
mod grants;

pub use audit::{InconsistencyReason, InconsistentAssignment};
pub use bulk_edit::{BulkEditReport, BulkEditRowOutcome, RoleColumnEdit, parse_role_column};

/// Principals granted and revoked by one reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipChange {
    /// Principals that gained the role.
    pub added: BTreeSet<Principal>,
    /// Principals that lost the role.
    pub removed: BTreeSet<Principal>,
}

impl MembershipChange {
    /// Returns whether the reconcile changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl From<&MembershipPlan> for MembershipChange {
    fn from(plan: &MembershipPlan) -> Self {
        Self {
            added: plan.added(),
            removed: plan.removed(),
        }
    }
}

/// Application service replacing a resource-role grantee set with a desired set.
///
/// The service issues no notifications; callers react to the returned
/// [`MembershipChange`] after the store has committed.
#[derive(Clone)]
pub struct MembershipService {
    catalog: Arc<RoleCatalog>,
    store: Arc<dyn AssignmentStore>,
    principal_directory: Arc<dyn PrincipalDirectory>,
    resource_directory: Arc<dyn ResourceDirectory>,
}

impl MembershipService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        catalog: Arc<RoleCatalog>,
        store: Arc<dyn AssignmentStore>,
        principal_directory: Arc<dyn PrincipalDirectory>,
        resource_directory: Arc<dyn ResourceDirectory>,
    ) -> Self {
        Self {
            catalog,
            store,
            principal_directory,
            resource_directory,
        }
    }

    /// Makes the role's grantees on the resource exactly `desired`.
    ///
    /// A desired set equal to the current one performs no store mutation. Any
    /// failure, including an unresolvable current grantee, leaves the
    /// membership untouched.
    pub async fn reconcile(
        &self,
        resource: &ResourceRef,
        role_name: &str,
        desired: BTreeSet<Principal>,
    ) -> AppResult<MembershipChange> {
        let role = self.resolve_role(resource, role_name)?;
        let (edit, plan) = self.plan_locked(resource, role, &desired).await?;
        let change = MembershipChange::from(&plan);

        if plan.is_empty() {
            debug!(
                resource = %resource,
                role = role.name(),
                "membership already matches desired set"
            );
            return Ok(change);
        }

        edit.commit(&plan).await?;

        info!(
            resource = %resource,
            role = role.name(),
            added = change.added.len(),
            removed = change.removed.len(),
            "membership reconciled"
        );

        Ok(change)
    }

    /// Reconciles a desired set expressed as email addresses.
    ///
    /// Every email must resolve through the principal directory before the
    /// store is touched.
    pub async fn reconcile_by_email(
        &self,
        resource: &ResourceRef,
        role_name: &str,
        emails: &[EmailAddress],
    ) -> AppResult<MembershipChange> {
        let desired = self.resolve_emails(emails).await?;
        self.reconcile(resource, role_name, desired).await
    }

    /// Computes what [`MembershipService::reconcile`] would change without
    /// committing it.
    pub async fn preview(
        &self,
        resource: &ResourceRef,
        role_name: &str,
        desired: BTreeSet<Principal>,
    ) -> AppResult<MembershipChange> {
        let role = self.resolve_role(resource, role_name)?;
        let (_edit, plan) = self.plan_locked(resource, role, &desired).await?;

        Ok(MembershipChange::from(&plan))
    }

    /// Lists current grantees of the named role on the resource.
    pub async fn list_principals(
        &self,
        resource: &ResourceRef,
        role_name: &str,
    ) -> AppResult<Vec<Principal>> {
        let role = self.resolve_role(resource, role_name)?;
        self.store.list_principals(resource, role.role_id()).await
    }

    fn resolve_role(&self, resource: &ResourceRef, role_name: &str) -> AppResult<&Role> {
        self.catalog.require_roleable(resource)?;
        self.catalog.find_role(resource.resource_type(), role_name)
    }

    async fn resolve_emails(&self, emails: &[EmailAddress]) -> AppResult<BTreeSet<Principal>> {
        let mut desired = BTreeSet::new();
        for email in emails {
            let principal = self
                .principal_directory
                .find_by_email(email)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!("no principal is registered for '{email}'"))
                })?;
            desired.insert(principal);
        }

        Ok(desired)
    }

    /// Opens an edit on the membership and plans against it while it is held.
    async fn plan_locked(
        &self,
        resource: &ResourceRef,
        role: &Role,
        desired: &BTreeSet<Principal>,
    ) -> AppResult<(Box<dyn MembershipEdit>, MembershipPlan)> {
        let edit = self.store.begin_membership_edit(resource, role).await?;
        let index = self.natural_key_index(edit.current()).await?;
        let plan = plan_membership(edit.current(), desired, &index)?;

        Ok((edit, plan))
    }

    /// Indexes current grants by the email the directory holds for each grantee.
    ///
    /// Grantees the directory no longer knows are left out, so removing them
    /// surfaces as an inconsistent membership.
    async fn natural_key_index(&self, current: &[Assignment]) -> AppResult<NaturalKeyIndex> {
        let mut index = NaturalKeyIndex::new();
        for assignment in current {
            let principal_id = assignment.principal().principal_id();
            if let Some(principal) = self.principal_directory.find_by_id(principal_id).await? {
                index.insert(principal.email().clone(), assignment.assignment_id())?;
            }
        }

        Ok(index)
    }
}
