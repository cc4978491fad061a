use std::path::Path;

use aclgate_application::{RoleCatalog, RoleCatalogSeed};
use aclgate_core::{AppError, AppResult};
use tracing::info;

/// Loads and validates a role catalog from a JSON seed file.
pub fn load_role_catalog(path: &Path) -> AppResult<RoleCatalog> {
    let document = std::fs::read_to_string(path).map_err(|error| {
        AppError::Internal(format!(
            "failed to read role catalog '{}': {error}",
            path.display()
        ))
    })?;

    let catalog = parse_role_catalog(document.as_str())?;
    info!(
        path = %path.display(),
        roles = catalog.len(),
        "role catalog loaded"
    );

    Ok(catalog)
}

/// Parses a JSON seed document into a validated role catalog.
pub fn parse_role_catalog(document: &str) -> AppResult<RoleCatalog> {
    let seed: RoleCatalogSeed = serde_json::from_str(document)
        .map_err(|error| AppError::Validation(format!("invalid role catalog seed: {error}")))?;

    RoleCatalog::from_seed(seed)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use aclgate_core::AppError;
    use aclgate_domain::ResourceType;

    use super::{load_role_catalog, parse_role_catalog};

    const SEED: &str = r#"{
        "resource_types": [
            {
                "name": "Program",
                "capabilities": ["roleable", "commentable"],
                "roles": [
                    {
                        "id": "6f1c1c3e-8d4a-4c57-9d0e-0c1f8b1f6a01",
                        "name": "Program Managers",
                        "permissions": ["read", "update", "delete"]
                    },
                    {
                        "id": "6f1c1c3e-8d4a-4c57-9d0e-0c1f8b1f6a02",
                        "name": "Program Readers",
                        "permissions": ["read"]
                    }
                ]
            },
            { "name": "Comment", "capabilities": ["commentable"] }
        ]
    }"#;

    #[test]
    fn seed_document_is_parsed_into_catalog() {
        let catalog = parse_role_catalog(SEED).unwrap_or_default();
        let program = ResourceType::new("Program").unwrap_or_else(|_| unreachable!());

        assert_eq!(catalog.len(), 2);
        assert!(catalog.find_role(&program, "Program Readers").is_ok());
    }

    #[test]
    fn malformed_seed_is_a_validation_error() {
        assert!(matches!(
            parse_role_catalog("{\"resource_types\": 3}"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn missing_seed_file_is_reported() {
        let result = load_role_catalog(Path::new("/nonexistent/aclgate/roles.json"));

        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
