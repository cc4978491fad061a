use std::collections::BTreeSet;

use aclgate_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Name of a resource type, e.g. `Program` or `CycleTaskGroupObjectTask`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(NonEmptyString);

impl ResourceType {
    /// Creates a validated resource type name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?))
    }

    /// Returns the type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Opaque reference to a domain object that roles are granted on.
///
/// The access-control core never owns the lifecycle of the referenced object;
/// it only indexes assignments by this pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    resource_type: ResourceType,
    resource_id: NonEmptyString,
}

impl ResourceRef {
    /// Creates a validated resource reference.
    pub fn new(
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            resource_type: ResourceType::new(resource_type)?,
            resource_id: NonEmptyString::new(resource_id)?,
        })
    }

    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the resource identifier within its type.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        self.resource_id.as_str()
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}#{}", self.resource_type, self.resource_id)
    }
}

/// Capability tags describing what a resource type supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// People can be granted roles on the resource.
    Roleable,
    /// The resource accepts comments.
    Commentable,
    /// The resource carries a workflow status.
    Stateful,
    /// The resource has start and end dates.
    Timeboxed,
    /// The resource may require a verification step before completion.
    Verifiable,
}

/// Externally supplied metadata for one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeDescriptor {
    resource_type: ResourceType,
    capabilities: BTreeSet<Capability>,
}

impl ResourceTypeDescriptor {
    /// Creates a descriptor from a type and its capability tags.
    #[must_use]
    pub fn new(
        resource_type: ResourceType,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            resource_type,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Returns the described type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the capability tags.
    #[must_use]
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    /// Returns whether the type carries the capability.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, ResourceRef, ResourceType, ResourceTypeDescriptor};

    #[test]
    fn resource_ref_rejects_blank_id() {
        assert!(ResourceRef::new("Program", " ").is_err());
    }

    #[test]
    fn resource_ref_formats_type_and_id() {
        let resource = ResourceRef::new("Program", "42").unwrap_or_else(|_| unreachable!());
        assert_eq!(resource.to_string(), "Program#42");
    }

    #[test]
    fn descriptor_reports_capabilities() {
        let resource_type = ResourceType::new("Facility").unwrap_or_else(|_| unreachable!());
        let descriptor = ResourceTypeDescriptor::new(
            resource_type,
            [Capability::Roleable, Capability::Commentable],
        );

        assert!(descriptor.supports(Capability::Roleable));
        assert!(!descriptor.supports(Capability::Timeboxed));
    }
}
