//! Minimal add/remove planning for one (resource, role) membership.
//!
//! The current set is materialised: every member carries the assignment that
//! grants it. The desired set is reference-only. Adds are found by principal
//! identity; each removal is resolved to its assignment through a
//! [`NaturalKeyIndex`] built once for the current membership.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use aclgate_core::{AppError, AppResult};

use crate::{Assignment, AssignmentId, EmailAddress, Principal, PrincipalId};

/// Lookup from a principal's natural key to the assignment that can be removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NaturalKeyIndex {
    handles: HashMap<EmailAddress, AssignmentId>,
}

impl NaturalKeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes assignments by the email recorded on each grant.
    pub fn from_assignments<'a>(
        assignments: impl IntoIterator<Item = &'a Assignment>,
    ) -> AppResult<Self> {
        let mut index = Self::new();
        for assignment in assignments {
            index.insert(
                assignment.principal().email().clone(),
                assignment.assignment_id(),
            )?;
        }

        Ok(index)
    }

    /// Adds one key.
    ///
    /// Two grants sharing a key make removal ambiguous, so the second insert
    /// fails instead of overwriting the first.
    pub fn insert(&mut self, key: EmailAddress, assignment_id: AssignmentId) -> AppResult<()> {
        match self.handles.entry(key) {
            Entry::Occupied(entry) if *entry.get() != assignment_id => {
                Err(AppError::InconsistentMembership(format!(
                    "email '{}' resolves to more than one assignment ({} and {assignment_id})",
                    entry.key(),
                    entry.get()
                )))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(assignment_id);
                Ok(())
            }
        }
    }

    /// Returns the assignment indexed under the key.
    #[must_use]
    pub fn handle_for(&self, key: &EmailAddress) -> Option<AssignmentId> {
        self.handles.get(key).copied()
    }

    /// Returns the number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Add and remove sets that turn a current membership into a desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    to_add: Vec<Principal>,
    to_remove: Vec<Assignment>,
}

impl MembershipPlan {
    /// Principals to grant, in identifier order.
    #[must_use]
    pub fn to_add(&self) -> &[Principal] {
        &self.to_add
    }

    /// Assignments to revoke, in current listing order.
    #[must_use]
    pub fn to_remove(&self) -> &[Assignment] {
        &self.to_remove
    }

    /// Returns whether applying the plan would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Returns the number of store mutations the plan performs.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    /// Returns the granted principals as a set.
    #[must_use]
    pub fn added(&self) -> BTreeSet<Principal> {
        self.to_add.iter().cloned().collect()
    }

    /// Returns the revoked principals as a set.
    #[must_use]
    pub fn removed(&self) -> BTreeSet<Principal> {
        self.to_remove
            .iter()
            .map(|assignment| assignment.principal().clone())
            .collect()
    }
}

/// Plans the minimal change from `current` to `desired`.
///
/// Every current member absent from `desired` must resolve through `index`
/// to one of the `current` assignments for the same principal; otherwise the
/// whole plan fails with [`AppError::InconsistentMembership`] and nothing is
/// returned to apply.
pub fn plan_membership(
    current: &[Assignment],
    desired: &BTreeSet<Principal>,
    index: &NaturalKeyIndex,
) -> AppResult<MembershipPlan> {
    let current_ids: HashSet<PrincipalId> = current
        .iter()
        .map(|assignment| assignment.principal().principal_id())
        .collect();
    let desired_ids: HashSet<PrincipalId> =
        desired.iter().map(Principal::principal_id).collect();
    let by_handle: HashMap<AssignmentId, &Assignment> = current
        .iter()
        .map(|assignment| (assignment.assignment_id(), assignment))
        .collect();

    let to_add = desired
        .iter()
        .filter(|principal| !current_ids.contains(&principal.principal_id()))
        .cloned()
        .collect();

    let mut to_remove = Vec::new();
    for member in current {
        let principal = member.principal();
        if desired_ids.contains(&principal.principal_id()) {
            continue;
        }

        let handle = index.handle_for(principal.email()).ok_or_else(|| {
            AppError::InconsistentMembership(format!(
                "grantee '{principal}' on '{}' cannot be resolved by email",
                member.resource()
            ))
        })?;

        let assignment = by_handle
            .get(&handle)
            .filter(|assignment| assignment.principal() == principal)
            .ok_or_else(|| {
                AppError::InconsistentMembership(format!(
                    "email '{}' resolves to assignment {handle} which does not grant '{principal}'",
                    principal.email()
                ))
            })?;

        to_remove.push((*assignment).clone());
    }

    Ok(MembershipPlan { to_add, to_remove })
}
