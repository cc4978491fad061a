use aclgate_domain::MembershipPlan;

use super::*;

/// Open transaction holding the advisory lock of one membership.
///
/// Dropping it without committing rolls the transaction back.
pub(super) struct PostgresMembershipEdit {
    transaction: Transaction<'static, Postgres>,
    resource: ResourceRef,
    role: Role,
    current: Vec<Assignment>,
}

impl PostgresMembershipEdit {
    pub(super) fn new(
        transaction: Transaction<'static, Postgres>,
        resource: ResourceRef,
        role: Role,
        current: Vec<Assignment>,
    ) -> Self {
        Self {
            transaction,
            resource,
            role,
            current,
        }
    }
}

#[async_trait]
impl MembershipEdit for PostgresMembershipEdit {
    fn current(&self) -> &[Assignment] {
        &self.current
    }

    async fn commit(self: Box<Self>, plan: &MembershipPlan) -> AppResult<Vec<Assignment>> {
        let Self {
            mut transaction,
            resource,
            role,
            current: _,
        } = *self;

        let removed: Vec<Uuid> = plan
            .to_remove()
            .iter()
            .map(|assignment| assignment.assignment_id().as_uuid())
            .collect();
        if !removed.is_empty() {
            let deleted = sqlx::query("DELETE FROM role_assignments WHERE id = ANY($1)")
                .bind(&removed)
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to delete assignments: {error}"))
                })?;

            if deleted.rows_affected() != removed.len() as u64 {
                return Err(AppError::AssignmentNotFound(format!(
                    "{} of {} assignments to revoke on '{resource}' are no longer stored",
                    removed.len() as u64 - deleted.rows_affected(),
                    removed.len()
                )));
            }
        }

        let mut added = Vec::with_capacity(plan.to_add().len());
        for principal in plan.to_add() {
            let assignment = Assignment::new(resource.clone(), &role, principal.clone())?;
            insert_assignment(&mut transaction, &assignment).await?;
            added.push(assignment);
        }

        commit(transaction).await?;

        Ok(added)
    }
}
