//! Domain entities and invariants for per-resource role assignment.

#![forbid(unsafe_code)]

mod assignment;
mod membership;
mod principal;
mod resource;
mod role;

pub use assignment::{Assignment, AssignmentId};
pub use membership::{MembershipPlan, NaturalKeyIndex, plan_membership};
pub use principal::{EmailAddress, Principal, PrincipalContext, PrincipalId};
pub use resource::{Capability, ResourceRef, ResourceType, ResourceTypeDescriptor};
pub use role::{Permission, Role, RoleId};
