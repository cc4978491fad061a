use std::collections::{BTreeMap, HashMap};

use aclgate_core::{AppError, AppResult};
use aclgate_domain::{
    Capability, Permission, ResourceRef, ResourceType, ResourceTypeDescriptor, Role, RoleId,
};
use serde::Deserialize;

/// Seed document describing resource types and the roles registered on them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleCatalogSeed {
    /// Resource types in the order they are registered.
    pub resource_types: Vec<ResourceTypeSeed>,
}

/// Seed entry for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceTypeSeed {
    /// Resource type name.
    pub name: String,
    /// Capability tags of the type.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Roles applicable to the type.
    #[serde(default)]
    pub roles: Vec<RoleSeed>,
}

/// Seed entry for one role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleSeed {
    /// Stable role identifier.
    pub id: RoleId,
    /// Role name, unique within the resource type.
    pub name: String,
    /// Permissions granted by the role.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Read-only registry of roles scoped to resource types.
///
/// Built once at startup; lookups never mutate it, so one instance can be
/// shared behind an `Arc` by every request.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    resource_types: BTreeMap<ResourceType, ResourceTypeDescriptor>,
    roles: Vec<Role>,
    by_name: HashMap<(ResourceType, String), usize>,
    by_id: HashMap<RoleId, usize>,
}

impl RoleCatalog {
    /// Builds a validated catalog.
    ///
    /// Every role must target a registered type carrying the `roleable`
    /// capability; role names are unique per type and role ids are unique
    /// across the catalog.
    pub fn new(
        resource_types: impl IntoIterator<Item = ResourceTypeDescriptor>,
        roles: impl IntoIterator<Item = Role>,
    ) -> AppResult<Self> {
        let mut catalog = Self::default();

        for descriptor in resource_types {
            let resource_type = descriptor.resource_type().clone();
            if catalog
                .resource_types
                .insert(resource_type.clone(), descriptor)
                .is_some()
            {
                return Err(AppError::Validation(format!(
                    "resource type '{resource_type}' is registered twice"
                )));
            }
        }

        for role in roles {
            catalog.register_role(role)?;
        }

        Ok(catalog)
    }

    /// Builds a catalog from a deserialized seed document.
    pub fn from_seed(seed: RoleCatalogSeed) -> AppResult<Self> {
        let mut descriptors = Vec::with_capacity(seed.resource_types.len());
        let mut roles = Vec::new();

        for type_seed in seed.resource_types {
            let resource_type = ResourceType::new(type_seed.name)?;
            for role_seed in type_seed.roles {
                roles.push(Role::new(
                    role_seed.id,
                    role_seed.name,
                    resource_type.clone(),
                    role_seed.permissions,
                )?);
            }
            descriptors.push(ResourceTypeDescriptor::new(
                resource_type,
                type_seed.capabilities,
            ));
        }

        Self::new(descriptors, roles)
    }

    fn register_role(&mut self, role: Role) -> AppResult<()> {
        let descriptor = self.resource_types.get(role.resource_type()).ok_or_else(|| {
            AppError::Validation(format!(
                "role '{}' targets unregistered resource type '{}'",
                role.name(),
                role.resource_type()
            ))
        })?;

        if !descriptor.supports(Capability::Roleable) {
            return Err(AppError::Validation(format!(
                "role '{}' targets resource type '{}' which is not roleable",
                role.name(),
                role.resource_type()
            )));
        }

        let name_key = (role.resource_type().clone(), role.name().to_owned());
        if self.by_name.contains_key(&name_key) {
            return Err(AppError::Validation(format!(
                "role '{}' is registered twice for resource type '{}'",
                role.name(),
                role.resource_type()
            )));
        }

        if self.by_id.contains_key(&role.role_id()) {
            return Err(AppError::Validation(format!(
                "role id '{}' is registered twice",
                role.role_id()
            )));
        }

        let position = self.roles.len();
        self.by_name.insert(name_key, position);
        self.by_id.insert(role.role_id(), position);
        self.roles.push(role);

        Ok(())
    }

    /// Finds a role by exact, case-sensitive name within a resource type.
    pub fn find_role(&self, resource_type: &ResourceType, name: &str) -> AppResult<&Role> {
        self.by_name
            .get(&(resource_type.clone(), name.to_owned()))
            .map(|position| &self.roles[*position])
            .ok_or_else(|| {
                AppError::RoleNotFound(format!(
                    "role '{name}' is not registered for resource type '{resource_type}'"
                ))
            })
    }

    /// Returns all roles applicable to a resource type, ordered by name.
    #[must_use]
    pub fn roles_for_type(&self, resource_type: &ResourceType) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self
            .roles
            .iter()
            .filter(|role| role.resource_type() == resource_type)
            .collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));
        roles
    }

    /// Returns every role carrying the name, across resource types.
    #[must_use]
    pub fn roles_named(&self, name: &str) -> Vec<&Role> {
        self.roles.iter().filter(|role| role.name() == name).collect()
    }

    /// Returns a role by identifier.
    #[must_use]
    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.by_id.get(&role_id).map(|position| &self.roles[*position])
    }

    /// Returns the descriptor of a registered resource type.
    #[must_use]
    pub fn descriptor(&self, resource_type: &ResourceType) -> Option<&ResourceTypeDescriptor> {
        self.resource_types.get(resource_type)
    }

    /// Ensures roles can be assigned on the resource's type.
    pub fn require_roleable(&self, resource: &ResourceRef) -> AppResult<&ResourceTypeDescriptor> {
        self.descriptor(resource.resource_type())
            .filter(|descriptor| descriptor.supports(Capability::Roleable))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "resource type '{}' does not accept role assignments",
                    resource.resource_type()
                ))
            })
    }

    /// Returns the number of registered roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns whether no roles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests;
