use super::*;

use tracing::warn;

/// Why a stored grant no longer matches the systems it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InconsistencyReason {
    /// The grantee was deleted from the principal directory.
    PrincipalMissing,
    /// The grantee's email changed since the grant was recorded.
    EmailChanged {
        /// Email the directory currently holds.
        current: EmailAddress,
    },
    /// The resource was deleted by its owning system.
    ResourceMissing,
}

/// A stored grant that references drifted external state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InconsistentAssignment {
    /// The affected grant.
    pub assignment: Assignment,
    /// Detected drift.
    pub reason: InconsistencyReason,
}

impl MembershipService {
    /// Reports grants of the named role whose principal or resource drifted.
    ///
    /// Read-only: inconsistent grants are listed, never repaired.
    pub async fn audit_membership(
        &self,
        resource: &ResourceRef,
        role_name: &str,
    ) -> AppResult<Vec<InconsistentAssignment>> {
        let role = self.resolve_role(resource, role_name)?;
        let assignments = self.store.list_assignments(resource, role.role_id()).await?;
        let resource_exists = self.resource_directory.resource_exists(resource).await?;

        let mut findings = Vec::new();
        for assignment in assignments {
            let recorded = assignment.principal();
            let reason = if !resource_exists {
                Some(InconsistencyReason::ResourceMissing)
            } else {
                match self
                    .principal_directory
                    .find_by_id(recorded.principal_id())
                    .await?
                {
                    None => Some(InconsistencyReason::PrincipalMissing),
                    Some(current) if current.email() != recorded.email() => {
                        Some(InconsistencyReason::EmailChanged {
                            current: current.email().clone(),
                        })
                    }
                    Some(_) => None,
                }
            };

            if let Some(reason) = reason {
                warn!(
                    resource = %resource,
                    role = role.name(),
                    assignment_id = %assignment.assignment_id(),
                    principal = %recorded,
                    reason = ?reason,
                    "inconsistent assignment"
                );
                findings.push(InconsistentAssignment { assignment, reason });
            }
        }

        Ok(findings)
    }
}
