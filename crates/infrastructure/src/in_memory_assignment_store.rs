use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};

use aclgate_application::{AssignmentStore, MembershipEdit};
use aclgate_core::{AppError, AppResult};
use aclgate_domain::{
    Assignment, AssignmentId, MembershipPlan, Principal, PrincipalId, ResourceRef, Role, RoleId,
};
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

type MembershipKey = (ResourceRef, RoleId);
type MembershipTable = HashMap<MembershipKey, Vec<Assignment>>;
type EditLockTable = Arc<std::sync::Mutex<HashMap<MembershipKey, Arc<Mutex<()>>>>>;

/// In-memory assignment store.
///
/// Writers to one (resource, role) pair queue on that pair's lock; readers
/// only ever see whole committed edits.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    memberships: Arc<RwLock<MembershipTable>>,
    edit_locks: EditLockTable,
    mutations: Arc<AtomicUsize>,
}

impl InMemoryAssignmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of grants added or removed since creation.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    async fn lock_membership(&self, key: &MembershipKey) -> MembershipLock {
        let lock = self
            .edit_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();

        MembershipLock {
            key: key.clone(),
            edit_locks: self.edit_locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Holds one pair's edit lock. The pair's entry leaves the lock table once
/// the last holder or waiter is gone.
struct MembershipLock {
    key: MembershipKey,
    edit_locks: EditLockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for MembershipLock {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut edit_locks = self
            .edit_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if edit_locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            edit_locks.remove(&self.key);
        }
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn add(
        &self,
        resource: &ResourceRef,
        role: &Role,
        principal: &Principal,
    ) -> AppResult<Assignment> {
        let key = (resource.clone(), role.role_id());
        let _guard = self.lock_membership(&key).await;

        let assignment = Assignment::new(resource.clone(), role, principal.clone())?;
        let mut memberships = self.memberships.write().await;
        let members = memberships.entry(key).or_default();
        if members
            .iter()
            .any(|stored| stored.principal().principal_id() == principal.principal_id())
        {
            return Err(AppError::DuplicateAssignment(format!(
                "'{principal}' already holds role '{}' on '{resource}'",
                role.name()
            )));
        }

        members.push(assignment.clone());
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(assignment)
    }

    async fn remove(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
        principal_id: PrincipalId,
    ) -> AppResult<()> {
        let key = (resource.clone(), role_id);
        let _guard = self.lock_membership(&key).await;

        let mut memberships = self.memberships.write().await;
        let position = memberships.get(&key).and_then(|members| {
            members
                .iter()
                .position(|stored| stored.principal().principal_id() == principal_id)
        });
        let (Some(members), Some(position)) = (memberships.get_mut(&key), position) else {
            return Err(AppError::AssignmentNotFound(format!(
                "principal '{principal_id}' holds no role '{role_id}' on '{resource}'"
            )));
        };

        members.remove(position);
        if members.is_empty() {
            memberships.remove(&key);
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_assignments(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
    ) -> AppResult<Vec<Assignment>> {
        Ok(self
            .memberships
            .read()
            .await
            .get(&(resource.clone(), role_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_resources_for_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<ResourceRef>> {
        let memberships = self.memberships.read().await;
        let mut resources: Vec<ResourceRef> = memberships
            .iter()
            .filter(|((_, role_id), members)| {
                role_ids.contains(role_id)
                    && members
                        .iter()
                        .any(|stored| stored.principal().principal_id() == principal_id)
            })
            .map(|((resource, _), _)| resource.clone())
            .collect();
        resources.sort();
        resources.dedup();

        Ok(resources)
    }

    async fn begin_membership_edit(
        &self,
        resource: &ResourceRef,
        role: &Role,
    ) -> AppResult<Box<dyn MembershipEdit>> {
        let key = (resource.clone(), role.role_id());
        let guard = self.lock_membership(&key).await;
        let current = self.list_assignments(resource, role.role_id()).await?;

        Ok(Box::new(InMemoryMembershipEdit {
            key,
            role: role.clone(),
            current,
            memberships: self.memberships.clone(),
            mutations: self.mutations.clone(),
            _guard: guard,
        }))
    }
}

struct InMemoryMembershipEdit {
    key: MembershipKey,
    role: Role,
    current: Vec<Assignment>,
    memberships: Arc<RwLock<MembershipTable>>,
    mutations: Arc<AtomicUsize>,
    _guard: MembershipLock,
}

#[async_trait]
impl MembershipEdit for InMemoryMembershipEdit {
    fn current(&self) -> &[Assignment] {
        &self.current
    }

    async fn commit(self: Box<Self>, plan: &MembershipPlan) -> AppResult<Vec<Assignment>> {
        let (resource, _) = &self.key;
        let removed: HashSet<AssignmentId> = plan
            .to_remove()
            .iter()
            .map(Assignment::assignment_id)
            .collect();
        let added = plan
            .to_add()
            .iter()
            .map(|principal| Assignment::new(resource.clone(), &self.role, principal.clone()))
            .collect::<AppResult<Vec<_>>>()?;

        let mut memberships = self.memberships.write().await;
        let members = memberships
            .get(&self.key)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if let Some(missing) = plan.to_remove().iter().find(|assignment| {
            !members
                .iter()
                .any(|stored| stored.assignment_id() == assignment.assignment_id())
        }) {
            return Err(AppError::AssignmentNotFound(format!(
                "assignment '{}' for '{}' is no longer stored",
                missing.assignment_id(),
                missing.principal()
            )));
        }

        let kept: HashSet<PrincipalId> = members
            .iter()
            .filter(|stored| !removed.contains(&stored.assignment_id()))
            .map(|stored| stored.principal().principal_id())
            .collect();
        if let Some(duplicate) = plan
            .to_add()
            .iter()
            .find(|principal| kept.contains(&principal.principal_id()))
        {
            return Err(AppError::DuplicateAssignment(format!(
                "'{duplicate}' already holds role '{}' on '{resource}'",
                self.role.name()
            )));
        }

        let mut members = memberships.remove(&self.key).unwrap_or_default();
        members.retain(|stored| !removed.contains(&stored.assignment_id()));
        members.extend(added.iter().cloned());
        if !members.is_empty() {
            memberships.insert(self.key.clone(), members);
        }
        self.mutations
            .fetch_add(plan.mutation_count(), Ordering::SeqCst);

        Ok(added)
    }
}
