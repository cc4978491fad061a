//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_assignment_store;
mod in_memory_directories;
mod postgres_assignment_store;
mod postgres_principal_directory;
mod role_catalog_file;

pub use in_memory_assignment_store::InMemoryAssignmentStore;
pub use in_memory_directories::{InMemoryPrincipalDirectory, InMemoryResourceDirectory};
pub use postgres_assignment_store::PostgresAssignmentStore;
pub use postgres_principal_directory::PostgresPrincipalDirectory;
pub use role_catalog_file::{load_role_catalog, parse_role_catalog};
