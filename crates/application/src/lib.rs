//! Application services and ports.

#![forbid(unsafe_code)]

mod access_control_ports;
mod authorization_service;
mod membership_service;
mod role_catalog;

#[cfg(test)]
mod test_support;

pub use access_control_ports::{
    AssignmentStore, MembershipEdit, OverduePredicate, PrincipalDirectory, ResourceDirectory,
};
pub use authorization_service::{
    AuthorizationService, OverdueCounts, TASK_ASSIGNEES_ROLE, TaskCountSummary, TaskSnapshot,
    TaskStatus,
};
pub use membership_service::{
    BulkEditReport, BulkEditRowOutcome, InconsistencyReason, InconsistentAssignment,
    MembershipChange, MembershipService, RoleColumnEdit, parse_role_column,
};
pub use role_catalog::{ResourceTypeSeed, RoleCatalog, RoleCatalogSeed, RoleSeed};
