use aclgate_application::PrincipalDirectory;
use aclgate_core::{AppError, AppResult};
use aclgate_domain::{EmailAddress, Principal, PrincipalId};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed principal directory.
#[derive(Clone)]
pub struct PostgresPrincipalDirectory {
    pool: PgPool,
}

impl PostgresPrincipalDirectory {
    /// Creates a directory with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers a principal or updates its email.
    pub async fn upsert(&self, principal: &Principal) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO principals (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                updated_at = now()
            "#,
        )
        .bind(principal.principal_id().as_uuid())
        .bind(principal.email().as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "email '{}' already belongs to another principal",
                        principal.email()
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to save principal: {error}"
                )))
            }
        }
    }

    /// Deletes a principal. Grants referencing it are left in place.
    pub async fn remove(&self, principal_id: PrincipalId) -> AppResult<bool> {
        let deleted = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(principal_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to delete principal: {error}")))?;

        Ok(deleted.rows_affected() > 0)
    }
}

#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: Uuid,
    email: String,
}

impl TryFrom<PrincipalRow> for Principal {
    type Error = AppError;

    fn try_from(row: PrincipalRow) -> AppResult<Self> {
        let email = EmailAddress::new(row.email).map_err(|error| {
            AppError::Internal(format!(
                "failed to decode email of principal '{}': {error}",
                row.id
            ))
        })?;

        Ok(Principal::new(PrincipalId::from_uuid(row.id), email))
    }
}

#[async_trait]
impl PrincipalDirectory for PostgresPrincipalDirectory {
    async fn find_by_id(&self, principal_id: PrincipalId) -> AppResult<Option<Principal>> {
        sqlx::query_as::<_, PrincipalRow>("SELECT id, email FROM principals WHERE id = $1")
            .bind(principal_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to find principal '{principal_id}': {error}"
                ))
            })?
            .map(Principal::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Principal>> {
        sqlx::query_as::<_, PrincipalRow>("SELECT id, email FROM principals WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to find principal by email: {error}"))
            })?
            .map(Principal::try_from)
            .transpose()
    }
}
