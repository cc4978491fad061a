use std::collections::BTreeMap;
use std::sync::Arc;

use aclgate_core::{AppError, AppResult};
use aclgate_domain::{PrincipalId, ResourceRef, RoleId};

use crate::access_control_ports::{AssignmentStore, OverduePredicate};
use crate::role_catalog::RoleCatalog;

mod permissions;
mod task_count;

pub use task_count::{TASK_ASSIGNEES_ROLE, TaskCountSummary, TaskSnapshot, TaskStatus};

/// Resources held by one principal, partitioned by an overdue predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverdueCounts {
    /// Resources the predicate classified as overdue.
    pub overdue: usize,
    /// Resources the predicate classified as not overdue.
    pub not_overdue: usize,
}

impl OverdueCounts {
    /// Returns the count for one classification.
    #[must_use]
    pub fn count(&self, overdue: bool) -> usize {
        if overdue {
            self.overdue
        } else {
            self.not_overdue
        }
    }

    /// Returns the number of classified resources.
    #[must_use]
    pub fn total(&self) -> usize {
        self.overdue + self.not_overdue
    }

    /// Returns the counts keyed by classification. Both keys are always present.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<bool, usize> {
        BTreeMap::from([(false, self.not_overdue), (true, self.overdue)])
    }

    fn record(&mut self, overdue: bool) {
        if overdue {
            self.overdue += 1;
        } else {
            self.not_overdue += 1;
        }
    }
}

/// Application service answering role and permission questions.
///
/// Every query names its principal explicitly; the service never consults an
/// ambient current user.
#[derive(Clone)]
pub struct AuthorizationService {
    catalog: Arc<RoleCatalog>,
    store: Arc<dyn AssignmentStore>,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(catalog: Arc<RoleCatalog>, store: Arc<dyn AssignmentStore>) -> Self {
        Self { catalog, store }
    }

    /// Returns whether the principal holds the named role on the resource.
    ///
    /// A principal without assignments yields `false`; a role name unknown for
    /// the resource type fails with `RoleNotFound`.
    pub async fn has_role(
        &self,
        principal_id: PrincipalId,
        resource: &ResourceRef,
        role_name: &str,
    ) -> AppResult<bool> {
        let role = self.catalog.find_role(resource.resource_type(), role_name)?;

        Ok(self
            .store
            .find_assignment(resource, role.role_id(), principal_id)
            .await?
            .is_some())
    }

    /// Counts resources on which the principal holds the named role, grouped
    /// by the predicate's classification.
    ///
    /// The role name is matched on every resource type that registers it.
    /// The result does not depend on enumeration order for a pure predicate.
    pub async fn count_by_overdue(
        &self,
        principal_id: PrincipalId,
        role_name: &str,
        predicate: &dyn OverduePredicate,
    ) -> AppResult<OverdueCounts> {
        let role_ids = self.role_ids_named(role_name)?;
        let classified = self
            .store
            .list_assignments_for_principal(principal_id, &role_ids, predicate)
            .await?;

        let mut counts = OverdueCounts::default();
        for (_, overdue) in classified {
            counts.record(overdue);
        }

        Ok(counts)
    }

    fn role_ids_named(&self, role_name: &str) -> AppResult<Vec<RoleId>> {
        let role_ids: Vec<RoleId> = self
            .catalog
            .roles_named(role_name)
            .into_iter()
            .map(|role| role.role_id())
            .collect();

        if role_ids.is_empty() {
            return Err(AppError::RoleNotFound(format!(
                "role '{role_name}' is not registered for any resource type"
            )));
        }

        Ok(role_ids)
    }
}
