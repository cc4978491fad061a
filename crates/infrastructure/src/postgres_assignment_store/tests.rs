use std::collections::BTreeSet;
use std::sync::Arc;

use aclgate_application::{
    AssignmentStore, MembershipService, PrincipalDirectory, RoleCatalog,
};
use aclgate_core::AppError;
use aclgate_domain::{
    Capability, EmailAddress, Permission, Principal, PrincipalId, ResourceRef, ResourceType,
    ResourceTypeDescriptor, Role, RoleId,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{InMemoryResourceDirectory, PostgresPrincipalDirectory};

use super::PostgresAssignmentStore;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres assignment tests: {error}");
    }

    Some(pool)
}

fn principal(local: &str) -> Principal {
    let email = format!("{local}.{}@example.com", Uuid::new_v4().simple());
    Principal::new(
        PrincipalId::new(),
        EmailAddress::new(email).unwrap_or_else(|_| unreachable!()),
    )
}

/// Resource ids are unique per test run so tests can share one database.
fn program() -> ResourceRef {
    ResourceRef::new("Program", Uuid::new_v4().to_string()).unwrap_or_else(|_| unreachable!())
}

fn catalog() -> Arc<RoleCatalog> {
    let program_type = ResourceType::new("Program").unwrap_or_else(|_| unreachable!());
    let admin = Role::new(
        RoleId::new(),
        "Admin",
        program_type.clone(),
        [Permission::Read, Permission::Update],
    )
    .unwrap_or_else(|_| unreachable!());

    Arc::new(
        RoleCatalog::new(
            [ResourceTypeDescriptor::new(
                program_type,
                [Capability::Roleable],
            )],
            [admin],
        )
        .unwrap_or_else(|_| unreachable!()),
    )
}

fn admin(catalog: &RoleCatalog) -> Role {
    catalog
        .find_role(
            &ResourceType::new("Program").unwrap_or_else(|_| unreachable!()),
            "Admin",
        )
        .unwrap_or_else(|_| unreachable!())
        .clone()
}

#[tokio::test]
async fn unique_constraint_rejects_duplicate_grants() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAssignmentStore::new(pool);
    let role = admin(&catalog());
    let resource = program();
    let alice = principal("alice");

    assert!(store.add(&resource, &role, &alice).await.is_ok());
    assert!(matches!(
        store.add(&resource, &role, &alice).await,
        Err(AppError::DuplicateAssignment(_))
    ));
    assert!(
        store
            .remove(&resource, role.role_id(), alice.principal_id())
            .await
            .is_ok()
    );
    assert!(matches!(
        store
            .remove(&resource, role.role_id(), alice.principal_id())
            .await,
        Err(AppError::AssignmentNotFound(_))
    ));
}

#[tokio::test]
async fn reconcile_commits_whole_plan() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let catalog = catalog();
    let role = admin(&catalog);
    let store = Arc::new(PostgresAssignmentStore::new(pool.clone()));
    let directory = Arc::new(PostgresPrincipalDirectory::new(pool));
    let alice = principal("alice");
    let bob = principal("bob");
    let carol = principal("carol");
    for person in [&alice, &bob, &carol] {
        assert!(directory.upsert(person).await.is_ok());
    }
    let resource = program();
    assert!(store.add(&resource, &role, &alice).await.is_ok());
    assert!(store.add(&resource, &role, &bob).await.is_ok());

    let service = MembershipService::new(
        catalog,
        store.clone(),
        directory,
        Arc::new(InMemoryResourceDirectory::new()),
    );
    let change = service
        .reconcile(&resource, "Admin", BTreeSet::from([bob.clone(), carol.clone()]))
        .await;

    assert!(change.is_ok_and(|change| {
        change.added == BTreeSet::from([carol.clone()])
            && change.removed == BTreeSet::from([alice.clone()])
    }));
    let listed: BTreeSet<Principal> = store
        .list_principals(&resource, role.role_id())
        .await
        .unwrap_or_default()
        .into_iter()
        .collect();
    assert_eq!(listed, BTreeSet::from([bob, carol]));
}

#[tokio::test]
async fn dropped_edit_rolls_back_and_releases_lock() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAssignmentStore::new(pool);
    let role = admin(&catalog());
    let resource = program();

    let edit = store.begin_membership_edit(&resource, &role).await;
    assert!(edit.is_ok());
    drop(edit);

    assert!(store.add(&resource, &role, &principal("dave")).await.is_ok());
    assert!(matches!(
        store.list_assignments(&resource, role.role_id()).await,
        Ok(listed) if listed.len() == 1
    ));
}

#[tokio::test]
async fn resources_for_principal_are_filtered_by_role() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAssignmentStore::new(pool);
    let role = admin(&catalog());
    let alice = principal("alice");
    let first = program();
    let second = program();
    assert!(store.add(&first, &role, &alice).await.is_ok());
    assert!(store.add(&second, &role, &alice).await.is_ok());

    let held = store
        .list_resources_for_principal(alice.principal_id(), &[role.role_id()])
        .await
        .unwrap_or_default();
    let other_role = store
        .list_resources_for_principal(alice.principal_id(), &[RoleId::new()])
        .await
        .unwrap_or_default();

    assert_eq!(
        held.into_iter().collect::<BTreeSet<_>>(),
        BTreeSet::from([first, second])
    );
    assert!(other_role.is_empty());
}

#[tokio::test]
async fn principal_directory_enforces_unique_email() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let directory = PostgresPrincipalDirectory::new(pool);
    let alice = principal("alice");
    assert!(directory.upsert(&alice).await.is_ok());

    let impostor = Principal::new(PrincipalId::new(), alice.email().clone());
    assert!(matches!(
        directory.upsert(&impostor).await,
        Err(AppError::Conflict(_))
    ));

    let found = directory.find_by_email(alice.email()).await.unwrap_or_default();
    assert_eq!(
        found.map(|principal| principal.principal_id()),
        Some(alice.principal_id())
    );

    assert!(matches!(directory.remove(alice.principal_id()).await, Ok(true)));
    assert!(matches!(
        directory.find_by_id(alice.principal_id()).await,
        Ok(None)
    ));
}
