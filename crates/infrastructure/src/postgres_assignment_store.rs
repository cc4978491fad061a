use aclgate_application::{AssignmentStore, MembershipEdit};
use aclgate_core::{AppError, AppResult};
use aclgate_domain::{
    Assignment, AssignmentId, EmailAddress, Principal, PrincipalId, ResourceRef, Role, RoleId,
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

mod membership_edit;

use membership_edit::PostgresMembershipEdit;

/// PostgreSQL-backed assignment store.
///
/// Writes to one (resource, role) membership take a transaction-scoped
/// advisory lock on that pair, so edits of different pairs never wait on each
/// other.
#[derive(Clone)]
pub struct PostgresAssignmentStore {
    pool: PgPool,
}

impl PostgresAssignmentStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    resource_type: String,
    resource_id: String,
    role_id: Uuid,
    principal_id: Uuid,
    principal_email: String,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> AppResult<Self> {
        let resource = ResourceRef::new(row.resource_type, row.resource_id).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode resource of assignment '{}': {error}",
                row.id
            ))
        })?;
        let email = EmailAddress::new(row.principal_email).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode grantee email of assignment '{}': {error}",
                row.id
            ))
        })?;

        Ok(Assignment::restore(
            AssignmentId::from_uuid(row.id),
            resource,
            RoleId::from_uuid(row.role_id),
            Principal::new(PrincipalId::from_uuid(row.principal_id), email),
        ))
    }
}

#[derive(Debug, FromRow)]
struct ResourceRow {
    resource_type: String,
    resource_id: String,
}

/// Serializes writers of one (resource, role) membership until the
/// transaction ends.
async fn lock_membership(
    transaction: &mut Transaction<'static, Postgres>,
    resource: &ResourceRef,
    role_id: RoleId,
) -> AppResult<()> {
    let key = format!(
        "{}\u{1f}{}\u{1f}{}",
        resource.resource_type(),
        resource.resource_id(),
        role_id
    );

    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to lock membership of '{resource}' for role '{role_id}': {error}"
            ))
        })?;

    Ok(())
}

async fn fetch_assignments(
    executor: impl sqlx::PgExecutor<'_>,
    resource: &ResourceRef,
    role_id: RoleId,
) -> AppResult<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(
        r#"
        SELECT id, resource_type, resource_id, role_id, principal_id, principal_email
        FROM role_assignments
        WHERE resource_type = $1
            AND resource_id = $2
            AND role_id = $3
        ORDER BY position
        "#,
    )
    .bind(resource.resource_type().as_str())
    .bind(resource.resource_id())
    .bind(role_id.as_uuid())
    .fetch_all(executor)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to list assignments of '{resource}' for role '{role_id}': {error}"
        ))
    })?;

    rows.into_iter().map(Assignment::try_from).collect()
}

async fn insert_assignment(
    transaction: &mut Transaction<'static, Postgres>,
    assignment: &Assignment,
) -> AppResult<()> {
    let principal = assignment.principal();
    let result = sqlx::query(
        r#"
        INSERT INTO role_assignments (
            id,
            resource_type,
            resource_id,
            role_id,
            principal_id,
            principal_email
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(assignment.assignment_id().as_uuid())
    .bind(assignment.resource().resource_type().as_str())
    .bind(assignment.resource().resource_id())
    .bind(assignment.role_id().as_uuid())
    .bind(principal.principal_id().as_uuid())
    .bind(principal.email().as_str())
    .execute(&mut **transaction)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(error) => {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23505")
            {
                return Err(AppError::DuplicateAssignment(format!(
                    "'{principal}' already holds role '{}' on '{}'",
                    assignment.role_id(),
                    assignment.resource()
                )));
            }

            Err(AppError::Internal(format!(
                "failed to insert assignment: {error}"
            )))
        }
    }
}

async fn commit(transaction: Transaction<'static, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

#[async_trait]
impl AssignmentStore for PostgresAssignmentStore {
    async fn add(
        &self,
        resource: &ResourceRef,
        role: &Role,
        principal: &Principal,
    ) -> AppResult<Assignment> {
        let assignment = Assignment::new(resource.clone(), role, principal.clone())?;

        let mut transaction = self.begin().await?;
        lock_membership(&mut transaction, resource, role.role_id()).await?;
        insert_assignment(&mut transaction, &assignment).await?;
        commit(transaction).await?;

        Ok(assignment)
    }

    async fn remove(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
        principal_id: PrincipalId,
    ) -> AppResult<()> {
        let mut transaction = self.begin().await?;
        lock_membership(&mut transaction, resource, role_id).await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM role_assignments
            WHERE resource_type = $1
                AND resource_id = $2
                AND role_id = $3
                AND principal_id = $4
            "#,
        )
        .bind(resource.resource_type().as_str())
        .bind(resource.resource_id())
        .bind(role_id.as_uuid())
        .bind(principal_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete assignment: {error}")))?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::AssignmentNotFound(format!(
                "principal '{principal_id}' holds no role '{role_id}' on '{resource}'"
            )));
        }

        commit(transaction).await
    }

    async fn list_assignments(
        &self,
        resource: &ResourceRef,
        role_id: RoleId,
    ) -> AppResult<Vec<Assignment>> {
        fetch_assignments(&self.pool, resource, role_id).await
    }

    async fn list_resources_for_principal(
        &self,
        principal_id: PrincipalId,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<ResourceRef>> {
        let role_ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ResourceRow>(
            r#"
            SELECT DISTINCT resource_type, resource_id
            FROM role_assignments
            WHERE principal_id = $1
                AND role_id = ANY($2)
            "#,
        )
        .bind(principal_id.as_uuid())
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list resources for principal '{principal_id}': {error}"
            ))
        })?;

        let mut resources = rows
            .into_iter()
            .map(|row| ResourceRef::new(row.resource_type, row.resource_id))
            .collect::<AppResult<Vec<_>>>()?;
        resources.sort();

        Ok(resources)
    }

    async fn begin_membership_edit(
        &self,
        resource: &ResourceRef,
        role: &Role,
    ) -> AppResult<Box<dyn MembershipEdit>> {
        let mut transaction = self.begin().await?;
        lock_membership(&mut transaction, resource, role.role_id()).await?;
        let current = fetch_assignments(&mut *transaction, resource, role.role_id()).await?;

        debug!(
            resource = %resource,
            role = role.name(),
            grantees = current.len(),
            "membership edit started"
        );

        Ok(Box::new(PostgresMembershipEdit::new(
            transaction,
            resource.clone(),
            role.clone(),
            current,
        )))
    }
}

#[cfg(test)]
mod tests;
