use super::*;

use serde::Deserialize;

/// One role column of an imported row: the full desired grantee list for a
/// role on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleColumnEdit {
    /// Resource type name.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Role name as displayed in the column header.
    #[serde(rename = "role")]
    pub role_name: String,
    /// Raw column value listing grantee emails.
    pub value: String,
}

/// Result of applying one role column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkEditRowOutcome {
    /// The column was empty and the membership was left unchanged.
    Skipped,
    /// The membership now equals the column value.
    Applied(MembershipChange),
    /// The row failed; its membership is unchanged.
    Failed {
        /// HTTP-equivalent status of the failure.
        status_code: u16,
        /// Failure message.
        message: String,
    },
}

/// Per-row outcomes of a bulk role edit, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkEditReport {
    /// One outcome per input row.
    pub rows: Vec<BulkEditRowOutcome>,
}

impl BulkEditReport {
    /// Returns the number of failed rows.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, BulkEditRowOutcome::Failed { .. }))
            .count()
    }

    /// Returns the number of granted and revoked principals across all rows.
    #[must_use]
    pub fn change_totals(&self) -> (usize, usize) {
        self.rows.iter().fold((0, 0), |(added, removed), row| match row {
            BulkEditRowOutcome::Applied(change) => {
                (added + change.added.len(), removed + change.removed.len())
            }
            _ => (added, removed),
        })
    }
}

/// Parses a role column value into grantee emails.
///
/// Entries are separated by commas, semicolons, or newlines. A blank value
/// yields `None`, meaning the column does not edit the membership.
pub fn parse_role_column(value: &str) -> AppResult<Option<Vec<EmailAddress>>> {
    if value.trim().is_empty() {
        return Ok(None);
    }

    let mut emails = Vec::new();
    for entry in value.split([',', ';', '\n']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let email = EmailAddress::new(entry)?;
        if !emails.contains(&email) {
            emails.push(email);
        }
    }

    Ok(Some(emails))
}

impl MembershipService {
    /// Applies role columns row by row.
    ///
    /// Each row reconciles independently: a failing row is reported and
    /// leaves its own membership untouched without stopping later rows. With
    /// `dry_run` every row is planned and nothing is committed.
    pub async fn apply_bulk_edit(
        &self,
        rows: &[RoleColumnEdit],
        dry_run: bool,
    ) -> BulkEditReport {
        let mut report = BulkEditReport::default();
        for row in rows {
            let outcome = match self.apply_role_column(row, dry_run).await {
                Ok(Some(change)) => BulkEditRowOutcome::Applied(change),
                Ok(None) => BulkEditRowOutcome::Skipped,
                Err(error) => BulkEditRowOutcome::Failed {
                    status_code: error.status_code(),
                    message: error.to_string(),
                },
            };
            report.rows.push(outcome);
        }

        report
    }

    async fn apply_role_column(
        &self,
        row: &RoleColumnEdit,
        dry_run: bool,
    ) -> AppResult<Option<MembershipChange>> {
        let Some(emails) = parse_role_column(row.value.as_str())? else {
            return Ok(None);
        };
        let resource = ResourceRef::new(row.resource_type.as_str(), row.resource_id.as_str())?;

        let change = if dry_run {
            let desired = self.resolve_emails(&emails).await?;
            self.preview(&resource, row.role_name.as_str(), desired)
                .await?
        } else {
            self.reconcile_by_email(&resource, row.role_name.as_str(), &emails)
                .await?
        };

        Ok(Some(change))
    }
}
