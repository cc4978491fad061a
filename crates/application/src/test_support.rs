//! Fakes shared by application service tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use aclgate_core::{AppError, AppResult};
use aclgate_domain::{
    Assignment, Capability, EmailAddress, MembershipPlan, Permission, Principal, PrincipalId,
    ResourceRef, ResourceType, ResourceTypeDescriptor, Role, RoleId,
};

use crate::{AssignmentStore, MembershipEdit, PrincipalDirectory, ResourceDirectory, RoleCatalog};

pub(crate) fn principal(email: &str) -> Principal {
    Principal::new(
        PrincipalId::new(),
        EmailAddress::new(email).unwrap_or_else(|_| unreachable!()),
    )
}

pub(crate) fn resource(resource_type: &str, resource_id: &str) -> ResourceRef {
    ResourceRef::new(resource_type, resource_id).unwrap_or_else(|_| unreachable!())
}

/// Catalog with `Program` roles `Admin` (read, update) and `Readers` (read),
/// and `CycleTaskGroupObjectTask` role `Task Assignees` (read, update).
pub(crate) fn catalog() -> Arc<RoleCatalog> {
    let program = ResourceType::new("Program").unwrap_or_else(|_| unreachable!());
    let task = ResourceType::new("CycleTaskGroupObjectTask").unwrap_or_else(|_| unreachable!());
    let comment = ResourceType::new("Comment").unwrap_or_else(|_| unreachable!());

    let roles = [
        Role::new(
            RoleId::new(),
            "Admin",
            program.clone(),
            [Permission::Read, Permission::Update],
        ),
        Role::new(RoleId::new(), "Readers", program.clone(), [Permission::Read]),
        Role::new(
            RoleId::new(),
            "Task Assignees",
            task.clone(),
            [Permission::Read, Permission::Update],
        ),
    ]
    .into_iter()
    .map(|role| role.unwrap_or_else(|_| unreachable!()));

    let catalog = RoleCatalog::new(
        [
            ResourceTypeDescriptor::new(program, [Capability::Roleable, Capability::Commentable]),
            ResourceTypeDescriptor::new(
                task,
                [
                    Capability::Roleable,
                    Capability::Stateful,
                    Capability::Timeboxed,
                    Capability::Verifiable,
                ],
            ),
            ResourceTypeDescriptor::new(comment, [Capability::Commentable]),
        ],
        roles,
    )
    .unwrap_or_else(|_| unreachable!());

    Arc::new(catalog)
}

#[derive(Default)]
pub(crate) struct FakeAssignmentStore {
    pub(crate) assignments: Arc<Mutex<Vec<Assignment>>>,
    pub(crate) mutations: Arc<AtomicUsize>,
}

impl FakeAssignmentStore {
    pub(crate) async fn seed(&self, resource: &ResourceRef, role: &Role, principal: &Principal) {
        let assignment = Assignment::new(resource.clone(), role, principal.clone())
            .unwrap_or_else(|_| unreachable!());
        self.assignments.lock().await.push(assignment);
    }

    pub(crate) fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssignmentStore for FakeAssignmentStore {
    async fn add(
        &self,
        resource: &ResourceRef,
        role: &Role,
        principal: &Principal,
    ) -> AppResult<Assignment> {
        let mut assignments = self.assignments.lock().await;
        if assignments
            .iter()
            .any(|stored| stored.matches(resource, role.role_id(), principal.principal_id()))
        {
            return Err(AppError::DuplicateAssignment(principal.to_string()));
        }

        let assignment = Assignment::new(resource.clone(), role, principal.clone())?;
        assignments.push(assignment.clone());
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(assignment)
    }

    async fn remove(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
        principal_id: PrincipalId,
    ) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        let before = assignments.len();
        assignments.retain(|stored| !stored.matches(resource, role_id, principal_id));
        if assignments.len() == before {
            return Err(AppError::AssignmentNotFound(principal_id.to_string()));
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
            .assignments
            .lock()
            .await
            .iter()
            .filter(|stored| stored.resource() == resource && stored.role_id() == role_id)
            .cloned()
            .collect())
    }

    async fn list_resources_for_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<ResourceRef>> {
        let mut resources: Vec<ResourceRef> = self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|stored| {
                stored.principal().principal_id() == principal_id
                    && role_ids.contains(&stored.role_id())
            })
            .map(|stored| stored.resource().clone())
            .collect();
        resources.sort();
        Ok(resources)
    }

    async fn begin_membership_edit(
        &self,
        resource: &ResourceRef,
        role: &Role,
    ) -> AppResult<Box<dyn MembershipEdit>> {
        let current = self.list_assignments(resource, role.role_id()).await?;
        Ok(Box::new(FakeMembershipEdit {
            resource: resource.clone(),
            role: role.clone(),
            current,
            assignments: self.assignments.clone(),
            mutations: self.mutations.clone(),
        }))
    }
}

struct FakeMembershipEdit {
    resource: ResourceRef,
    role: Role,
    current: Vec<Assignment>,
    assignments: Arc<Mutex<Vec<Assignment>>>,
    mutations: Arc<AtomicUsize>,
}

#[async_trait]
impl MembershipEdit for FakeMembershipEdit {
    fn current(&self) -> &[Assignment] {
        &self.current
    }

    async fn commit(self: Box<Self>, plan: &MembershipPlan) -> AppResult<Vec<Assignment>> {
        let mut assignments = self.assignments.lock().await;
        let removed: HashSet<_> = plan
            .to_remove()
            .iter()
            .map(Assignment::assignment_id)
            .collect();
        assignments.retain(|stored| !removed.contains(&stored.assignment_id()));

        let mut added = Vec::new();
        for principal in plan.to_add() {
            let assignment = Assignment::new(self.resource.clone(), &self.role, principal.clone())?;
            assignments.push(assignment.clone());
            added.push(assignment);
        }

        self.mutations
            .fetch_add(plan.mutation_count(), Ordering::SeqCst);
        Ok(added)
    }
}

#[derive(Default)]
pub(crate) struct FakePrincipalDirectory {
    pub(crate) principals: Mutex<HashMap<PrincipalId, Principal>>,
}

impl FakePrincipalDirectory {
    pub(crate) fn with(principals: &[&Principal]) -> Self {
        Self {
            principals: Mutex::new(
                principals
                    .iter()
                    .map(|principal| (principal.principal_id(), (*principal).clone()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl PrincipalDirectory for FakePrincipalDirectory {
    async fn find_by_id(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>> {
        Ok(self.principals.lock().await.get(&principal_id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Principal>> {
        Ok(self
            .principals
            .lock()
            .await
            .values()
            .find(|principal| principal.email() == email)
            .cloned())
    }
}

#[derive(Default)]
pub(crate) struct FakeResourceDirectory {
    pub(crate) deleted: HashSet<ResourceRef>,
}

#[async_trait]
impl ResourceDirectory for FakeResourceDirectory {
    async fn resource_exists(&self, resource: &ResourceRef) -> AppResult<bool> {
        Ok(!self.deleted.contains(resource))
    }
}
