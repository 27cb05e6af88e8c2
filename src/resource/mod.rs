//! IoT Central entity kinds managed by `iotc`
//!
//! Each kind implements [`declarative::ManagedResource`]:
//! - a schema with every attribute's mutability and replace rules
//! - `plan_to_request` / `response_to_state` translators
//! - the four remote calls, forwarded to a shared [`Client`]
//!
//! The client handle is created once by the provider and shared by every
//! kind; it is stateless and safe to use from many threads.

pub mod ad_group_user;
pub mod device;
pub mod organization;
pub mod roles;
pub mod service_principal_user;
pub mod user;

use declarative::Registry;
use iotcentral_client::Client;
use std::sync::Arc;

pub use ad_group_user::AdGroupUserResource;
pub use device::DeviceResource;
pub use organization::OrganizationResource;
pub use service_principal_user::ServicePrincipalUserResource;
pub use user::UserResource;

/// Client handle shared by every resource kind
pub type SharedClient = Arc<dyn Client>;

/// Declaration file table and resource type of every managed kind, in
/// apply order.
pub const KINDS: &[(&str, &str)] = &[
    ("organization", organization::TYPE_NAME),
    ("device", device::TYPE_NAME),
    ("user", user::TYPE_NAME),
    ("ad_group_user", ad_group_user::TYPE_NAME),
    ("service_principal_user", service_principal_user::TYPE_NAME),
];

/// Registry of every managed kind over one client
pub fn registry(client: &SharedClient) -> Registry {
    Registry::new()
        .with(OrganizationResource::new(Arc::clone(client)))
        .with(DeviceResource::new(Arc::clone(client)))
        .with(UserResource::new(Arc::clone(client)))
        .with(AdGroupUserResource::new(Arc::clone(client)))
        .with(ServicePrincipalUserResource::new(Arc::clone(client)))
}

/// Resource type for a declaration file table name
pub fn resource_type_for_table(table: &str) -> Option<&'static str> {
    KINDS
        .iter()
        .find(|(t, _)| *t == table)
        .map(|(_, resource_type)| *resource_type)
}

/// Required remote ID of a planned model.
///
/// Callers only reach this after the schema has validated the declaration,
/// so a missing ID means the planned state was tampered with.
fn required_id<'a>(kind: &'static str, id: Option<&'a str>) -> iotcentral_client::Result<&'a str> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| iotcentral_client::Error::Other(format!("{kind} has no id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotcentral_client::MockClient;

    #[test]
    fn test_registry_has_every_kind() {
        let client: SharedClient = Arc::new(MockClient::new());
        let registry = registry(&client);
        let types: Vec<&str> = registry.resource_types().collect();
        let expected: Vec<&str> = KINDS.iter().map(|(_, t)| *t).collect();
        assert_eq!(types, expected);
    }

    #[test]
    fn test_resource_type_for_table() {
        assert_eq!(
            resource_type_for_table("ad_group_user"),
            Some("iotcentral_ad_group_user")
        );
        assert_eq!(resource_type_for_table("widget"), None);
    }

    #[test]
    fn test_required_id() {
        assert_eq!(required_id("device", Some("d1")).unwrap(), "d1");
        assert!(required_id("device", Some("")).is_err());
        assert!(required_id("device", None).is_err());
    }
}
