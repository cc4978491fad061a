use aclgate_core::AppError;
use aclgate_domain::{
    Capability, Permission, ResourceRef, ResourceType, ResourceTypeDescriptor, Role, RoleId,
};

use super::{RoleCatalog, RoleCatalogSeed};

fn resource_type(name: &str) -> ResourceType {
    ResourceType::new(name).unwrap_or_else(|_| unreachable!())
}

fn roleable(name: &str) -> ResourceTypeDescriptor {
    ResourceTypeDescriptor::new(resource_type(name), [Capability::Roleable])
}

fn role(name: &str, type_name: &str) -> Role {
    Role::new(RoleId::new(), name, resource_type(type_name), [Permission::Read])
        .unwrap_or_else(|_| unreachable!())
}

#[test]
fn find_role_is_case_sensitive_and_type_scoped() {
    let catalog = RoleCatalog::new(
        [roleable("Program"), roleable("Audit")],
        [role("Admin", "Program"), role("Auditors", "Audit")],
    )
    .unwrap_or_else(|_| unreachable!());

    assert!(catalog.find_role(&resource_type("Program"), "Admin").is_ok());
    assert!(matches!(
        catalog.find_role(&resource_type("Program"), "admin"),
        Err(AppError::RoleNotFound(_))
    ));
    assert!(matches!(
        catalog.find_role(&resource_type("Audit"), "Admin"),
        Err(AppError::RoleNotFound(_))
    ));
}

#[test]
fn roles_for_type_lists_only_that_type_by_name() {
    let catalog = RoleCatalog::new(
        [roleable("Program"), roleable("Audit")],
        [
            role("Program Managers", "Program"),
            role("Admin", "Program"),
            role("Auditors", "Audit"),
        ],
    )
    .unwrap_or_else(|_| unreachable!());

    let names: Vec<&str> = catalog
        .roles_for_type(&resource_type("Program"))
        .into_iter()
        .map(Role::name)
        .collect();

    assert_eq!(names, vec!["Admin", "Program Managers"]);
}

#[test]
fn duplicate_role_name_in_type_is_rejected() {
    let result = RoleCatalog::new(
        [roleable("Program")],
        [role("Admin", "Program"), role("Admin", "Program")],
    );

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn same_role_name_on_two_types_is_allowed() {
    let catalog = RoleCatalog::new(
        [roleable("Program"), roleable("Audit")],
        [role("Admin", "Program"), role("Admin", "Audit")],
    )
    .unwrap_or_else(|_| unreachable!());

    assert_eq!(catalog.roles_named("Admin").len(), 2);
}

#[test]
fn roles_on_non_roleable_types_are_rejected() {
    let comment_only =
        ResourceTypeDescriptor::new(resource_type("Comment"), [Capability::Commentable]);

    let result = RoleCatalog::new([comment_only], [role("Admin", "Comment")]);

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn require_roleable_rejects_unknown_types() {
    let catalog = RoleCatalog::new([roleable("Program")], [role("Admin", "Program")])
        .unwrap_or_else(|_| unreachable!());
    let facility = ResourceRef::new("Facility", "3").unwrap_or_else(|_| unreachable!());

    assert!(catalog.require_roleable(&facility).is_err());
}

#[test]
fn seed_document_builds_catalog() {
    let admin_id = RoleId::new();
    let seed: RoleCatalogSeed = serde_json::from_value(serde_json::json!({
        "resource_types": [
            {
                "name": "Program",
                "capabilities": ["roleable", "commentable"],
                "roles": [
                    {
                        "id": admin_id.to_string(),
                        "name": "Admin",
                        "permissions": ["read", "update", "delete"]
                    }
                ]
            },
            { "name": "Comment", "capabilities": ["commentable"] }
        ]
    }))
    .unwrap_or_else(|_| unreachable!());

    let catalog = RoleCatalog::from_seed(seed).unwrap_or_else(|_| unreachable!());

    assert_eq!(catalog.len(), 1);
    let admin = catalog.role(admin_id);
    assert!(admin.is_some_and(|role| role.grants(Permission::Delete)));
    assert!(
        catalog
            .descriptor(&resource_type("Comment"))
            .is_some_and(|descriptor| !descriptor.supports(Capability::Roleable))
    );
}
