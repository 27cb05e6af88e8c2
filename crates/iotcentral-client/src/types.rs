//! Entity records and request bodies.
//!
//! Records are what the application returns; requests are what callers send
//! on create and update. Field names follow the REST API's camelCase JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2022-07-31";

/// A role assignment on a user: a role, optionally scoped to an organization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// ID of the role.
    pub role: String,
    /// ID of the organization the role is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl RoleAssignment {
    /// Application-wide role assignment.
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            organization: None,
        }
    }

    /// Role assignment scoped to an organization.
    pub fn scoped(role: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            organization: Some(organization.into()),
        }
    }
}

/// An organization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Caller-supplied unique ID.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// ID of the parent organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Body for creating or updating an organization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRequest {
    /// Display name.
    pub display_name: String,
    /// ID of the parent organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Body of an organization update.
///
/// Updates are merge patches: an omitted field keeps its value and `null`
/// clears it. `parent` is therefore always written, so that an organization
/// without a declared parent is moved back to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationPatch<'a> {
    /// Display name.
    pub display_name: &'a str,
    /// ID of the parent organization; `None` is sent as `null`.
    pub parent: Option<&'a str>,
}

impl<'a> From<&'a OrganizationRequest> for OrganizationPatch<'a> {
    fn from(request: &'a OrganizationRequest) -> Self {
        Self {
            display_name: &request.display_name,
            parent: request.parent.as_deref(),
        }
    }
}

/// A device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Caller-supplied unique ID.
    pub id: String,
    /// ETag used to detect conflicting updates.
    #[serde(default)]
    pub etag: String,
    /// Display name.
    pub display_name: String,
    /// Device template the device is assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Whether the device is simulated.
    #[serde(default)]
    pub simulated: bool,
    /// Whether resources have been allocated for the device.
    #[serde(default)]
    pub provisioned: bool,
    /// Whether the device may connect.
    #[serde(default)]
    pub enabled: bool,
    /// Organizations the device belongs to.
    #[serde(default)]
    pub organizations: Vec<String>,
}

/// Body for creating or updating a device.
///
/// Unset optional fields are omitted from the JSON body so the application
/// keeps or derives them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    /// Display name.
    pub display_name: String,
    /// Device template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Whether the device is simulated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated: Option<bool>,
    /// Whether the device may connect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Organizations the device belongs to, in declared order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizations: Option<Vec<String>>,
}

/// Discriminator of the user kinds the application knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserType {
    /// User identified by an email address.
    Email,
    /// Azure AD group.
    AdGroup,
    /// Azure AD service principal.
    ServicePrincipal,
}

impl UserType {
    /// Wire value of the `type` field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::AdGroup => "adGroup",
            Self::ServicePrincipal => "servicePrincipal",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An email user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// ID assigned on creation.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Role assignments.
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

/// Body for creating or updating an email user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRequest {
    /// Email address.
    pub email: String,
    /// Role assignments.
    pub roles: Vec<RoleAssignment>,
}

/// An Azure AD group user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupUser {
    /// ID assigned on creation.
    pub id: String,
    /// AAD object ID of the group.
    pub object_id: String,
    /// AAD tenant ID of the group.
    pub tenant_id: String,
    /// Role assignments.
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

/// Body for creating or updating an Azure AD group user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupUserRequest {
    /// AAD object ID of the group.
    pub object_id: String,
    /// AAD tenant ID of the group.
    pub tenant_id: String,
    /// Role assignments.
    pub roles: Vec<RoleAssignment>,
}

/// A service principal user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalUser {
    /// ID assigned on creation.
    pub id: String,
    /// AAD object ID of the service principal.
    pub object_id: String,
    /// AAD tenant ID of the service principal.
    pub tenant_id: String,
    /// Role assignments.
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

/// Body for creating or updating a service principal user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalUserRequest {
    /// AAD object ID of the service principal.
    pub object_id: String,
    /// AAD tenant ID of the service principal.
    pub tenant_id: String,
    /// Role assignments.
    pub roles: Vec<RoleAssignment>,
}

/// Any user record, tagged by its `type` field on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnyUser {
    /// Email user.
    #[serde(rename = "email")]
    Email(User),
    /// Azure AD group user.
    #[serde(rename = "adGroup")]
    AdGroup(AdGroupUser),
    /// Service principal user.
    #[serde(rename = "servicePrincipal")]
    ServicePrincipal(ServicePrincipalUser),
}

impl AnyUser {
    /// The user's ID.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Email(u) => &u.id,
            Self::AdGroup(u) => &u.id,
            Self::ServicePrincipal(u) => &u.id,
        }
    }

    /// The user's type discriminator.
    #[must_use]
    pub fn user_type(&self) -> UserType {
        match self {
            Self::Email(_) => UserType::Email,
            Self::AdGroup(_) => UserType::AdGroup,
            Self::ServicePrincipal(_) => UserType::ServicePrincipal,
        }
    }
}

/// A role record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Unique ID of the role.
    pub id: String,
    /// Canonical display name.
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_request_omits_unset_fields() {
        let req = DeviceRequest {
            display_name: "thermostat".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "displayName": "thermostat" }));
    }

    #[test]
    fn test_role_assignment_omits_missing_organization() {
        let json = serde_json::to_value(RoleAssignment::new("r1")).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "r1" }));
    }

    #[test]
    fn test_any_user_tagged_by_type() {
        let json = serde_json::json!({
            "type": "adGroup",
            "id": "u1",
            "objectId": "obj",
            "tenantId": "tenant",
            "roles": [{ "role": "r1", "organization": "org1" }]
        });
        let user: AnyUser = serde_json::from_value(json).unwrap();
        assert_eq!(user.user_type(), UserType::AdGroup);
        assert_eq!(user.id(), "u1");
        match user {
            AnyUser::AdGroup(u) => assert_eq!(u.roles, vec![RoleAssignment::scoped("r1", "org1")]),
            other => panic!("Expected AdGroup, got {other:?}"),
        }
    }

    #[test]
    fn test_device_defaults_missing_computed_fields() {
        let json = serde_json::json!({ "id": "d1", "displayName": "d" });
        let device: Device = serde_json::from_value(json).unwrap();
        assert!(device.organizations.is_empty());
        assert!(device.template.is_none());
        assert!(!device.provisioned);
    }
}
