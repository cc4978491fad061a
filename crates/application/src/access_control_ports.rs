mod assignment_store;
mod directories;
mod predicates;

pub use assignment_store::{AssignmentStore, MembershipEdit};
pub use directories::{PrincipalDirectory, ResourceDirectory};
pub use predicates::OverduePredicate;
