//! The [`Client`] trait and its implementations.
//!
//! [`http::HttpClient`] talks to a live application. [`MockClient`] keeps
//! entities in memory and is what the test suites run against:
//!
//! ```
//! use iotcentral_client::{Client, MockClient, OrganizationRequest};
//!
//! let mock = MockClient::new();
//! let org = mock
//!     .create_organization(
//!         "contoso",
//!         &OrganizationRequest {
//!             display_name: "Contoso".to_string(),
//!             parent: None,
//!         },
//!     )
//!     .unwrap();
//! assert_eq!(org.id, "contoso");
//! assert_eq!(mock.list_organizations().unwrap().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::roles;
use crate::types::{
    AdGroupUser, AdGroupUserRequest, AnyUser, Device, DeviceRequest, Organization,
    OrganizationPatch, OrganizationRequest, Role, ServicePrincipalUser,
    ServicePrincipalUserRequest, User, UserRequest, UserType,
};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Operations the reconciliation engine needs from an IoT Central application.
///
/// Every method apart from [`Client::new_user_id`] issues exactly one logical
/// request and blocks until it returns. Implementations must be safe to
/// share between threads.
pub trait Client: Send + Sync {
    /// Create an organization under a caller-supplied ID.
    fn create_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization>;
    /// Fetch an organization.
    fn get_organization(&self, id: &str) -> Result<Organization>;
    /// Update an organization.
    fn update_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization>;
    /// Delete an organization.
    fn delete_organization(&self, id: &str) -> Result<()>;
    /// List all organizations.
    fn list_organizations(&self) -> Result<Vec<Organization>>;

    /// Create a device under a caller-supplied ID.
    fn create_device(&self, id: &str, request: &DeviceRequest) -> Result<Device>;
    /// Fetch a device.
    fn get_device(&self, id: &str) -> Result<Device>;
    /// Update a device.
    fn update_device(&self, id: &str, request: &DeviceRequest) -> Result<Device>;
    /// Delete a device.
    fn delete_device(&self, id: &str) -> Result<()>;
    /// List all devices.
    fn list_devices(&self) -> Result<Vec<Device>>;

    /// Mint an ID for a new user of any type.
    ///
    /// User IDs are chosen by the caller. Mint one per entity and reuse it
    /// for every attempt at creating that entity.
    fn new_user_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Create an email user under a caller-supplied ID.
    fn create_user(&self, id: &str, request: &UserRequest) -> Result<User>;
    /// Fetch an email user.
    fn get_user(&self, id: &str) -> Result<User>;
    /// Update an email user.
    fn update_user(&self, id: &str, request: &UserRequest) -> Result<User>;
    /// Delete an email user.
    fn delete_user(&self, id: &str) -> Result<()>;
    /// List all email users.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Create an Azure AD group user under a caller-supplied ID.
    fn create_ad_group_user(
        &self,
        id: &str,
        request: &AdGroupUserRequest,
    ) -> Result<AdGroupUser>;
    /// Fetch an Azure AD group user.
    fn get_ad_group_user(&self, id: &str) -> Result<AdGroupUser>;
    /// Update an Azure AD group user.
    fn update_ad_group_user(&self, id: &str, request: &AdGroupUserRequest) -> Result<AdGroupUser>;
    /// Delete an Azure AD group user.
    fn delete_ad_group_user(&self, id: &str) -> Result<()>;
    /// List all Azure AD group users.
    fn list_ad_group_users(&self) -> Result<Vec<AdGroupUser>>;

    /// Create a service principal user under a caller-supplied ID.
    fn create_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser>;
    /// Fetch a service principal user.
    fn get_service_principal_user(&self, id: &str) -> Result<ServicePrincipalUser>;
    /// Update a service principal user.
    fn update_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser>;
    /// Delete a service principal user.
    fn delete_service_principal_user(&self, id: &str) -> Result<()>;
    /// List all service principal users.
    fn list_service_principal_users(&self) -> Result<Vec<ServicePrincipalUser>>;

    /// List all roles.
    fn list_roles(&self) -> Result<Vec<Role>>;

    /// Look up a role by display name, accepting the long-form aliases.
    ///
    /// The returned record carries the application's canonical name, not
    /// the query string.
    fn get_role_by_name(&self, display_name: &str) -> Result<Role> {
        let roles = self.list_roles()?;
        roles::find_role(&roles, display_name)
            .cloned()
            .ok_or_else(|| Error::RoleNotFound(display_name.to_string()))
    }
}

/// Well-known IDs of the built-in roles.
const BUILTIN_ROLES: &[(&str, &str)] = &[
    ("ca310b8d-2f4a-44e0-a36e-957c202cd8d4", "Administrator"),
    ("344138e9-8de4-4497-8c54-5237e96d6aaf", "Builder"),
    ("ae2c9854-393b-4f97-8c42-479d70ce626e", "Operator"),
    ("c495eb57-eb18-489e-9802-62c474e5645c", "Org Admin"),
    ("b4935647-30e4-4ed3-9074-dcac66c2f8ef", "Org Operator"),
    ("84cc62c1-dabe-49d3-b16e-8ab75bbee4ee", "Org Viewer"),
];

#[derive(Debug, Default)]
struct MockStore {
    organizations: Vec<Organization>,
    devices: Vec<Device>,
    users: Vec<AnyUser>,
    roles: Vec<Role>,
    next_user: u64,
    next_etag: u64,
    failures: VecDeque<Error>,
    calls: usize,
}

impl MockStore {
    fn etag(&mut self) -> String {
        self.next_etag += 1;
        format!("\"{}\"", self.next_etag)
    }

    fn user(&self, id: &str, expected: UserType) -> Result<&AnyUser> {
        let user = self
            .users
            .iter()
            .find(|u| u.id() == id)
            .ok_or_else(|| Error::not_found("user", id))?;
        if user.user_type() != expected {
            return Err(Error::UserTypeMismatch {
                id: id.to_string(),
                expected: expected.as_str(),
                actual: user.user_type().to_string(),
            });
        }
        Ok(user)
    }

    fn user_mut(&mut self, id: &str, expected: UserType) -> Result<&mut AnyUser> {
        self.user(id, expected)?;
        self.users
            .iter_mut()
            .find(|u| u.id() == id)
            .ok_or_else(|| Error::not_found("user", id))
    }

    fn insert_user(&mut self, user: AnyUser) -> Result<AnyUser> {
        if self.users.iter().any(|u| u.id() == user.id()) {
            return Err(Error::conflict("user", user.id(), "already exists"));
        }
        self.users.push(user.clone());
        Ok(user)
    }

    fn remove_user(&mut self, id: &str, expected: UserType) -> Result<()> {
        self.user(id, expected)?;
        self.users.retain(|u| u.id() != id);
        Ok(())
    }
}

/// In-memory client for testing without network access.
///
/// Clones share the same store. List operations return entities in
/// insertion order. Failures can be queued with [`MockClient::fail_next`];
/// each queued error is returned by the next call, whatever it is.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    store: Arc<Mutex<MockStore>>,
}

impl MockClient {
    /// Create an empty mock application.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock application seeded with the built-in roles.
    #[must_use]
    pub fn with_builtin_roles() -> Self {
        let mock = Self::new();
        for (id, name) in BUILTIN_ROLES {
            mock.add_role(id, name);
        }
        mock
    }

    /// Add a role.
    pub fn add_role(&self, id: &str, display_name: &str) {
        self.lock().roles.push(Role {
            id: id.to_string(),
            display_name: display_name.to_string(),
        });
    }

    /// Queue an error to be returned by the next call.
    pub fn fail_next(&self, error: Error) {
        self.lock().failures.push_back(error);
    }

    /// Number of calls made so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Change a device behind the reconciler's back.
    pub fn edit_device(&self, id: &str, edit: impl FnOnce(&mut Device)) {
        if let Some(device) = self.lock().devices.iter_mut().find(|d| d.id == id) {
            edit(device);
        }
    }

    /// Remove an organization behind the reconciler's back.
    pub fn forget_organization(&self, id: &str) {
        self.lock().organizations.retain(|o| o.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, MockStore> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Lock the store for one call, counting it and surfacing queued failures.
    fn call(&self) -> Result<MutexGuard<'_, MockStore>> {
        let mut store = self.lock();
        store.calls += 1;
        match store.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(store),
        }
    }
}

impl Client for MockClient {
    fn create_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization> {
        let mut store = self.call()?;
        if store.organizations.iter().any(|o| o.id == id) {
            return Err(Error::conflict("organization", id, "already exists"));
        }
        if let Some(parent) = &request.parent
            && !store.organizations.iter().any(|o| &o.id == parent)
        {
            return Err(Error::http(
                format!("parent organization {parent} does not exist"),
                Some(422),
            ));
        }
        let org = Organization {
            id: id.to_string(),
            display_name: request.display_name.clone(),
            parent: request.parent.clone(),
        };
        store.organizations.push(org.clone());
        Ok(org)
    }

    fn get_organization(&self, id: &str) -> Result<Organization> {
        let store = self.call()?;
        store
            .organizations
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("organization", id))
    }

    fn update_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization> {
        let mut store = self.call()?;
        let org = store
            .organizations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| Error::not_found("organization", id))?;
        let mut current = serde_json::to_value(&*org)?;
        merge_patch(
            &mut current,
            &serde_json::to_value(OrganizationPatch::from(request))?,
        );
        *org = serde_json::from_value(current)?;
        Ok(org.clone())
    }

    fn delete_organization(&self, id: &str) -> Result<()> {
        let mut store = self.call()?;
        if !store.organizations.iter().any(|o| o.id == id) {
            return Err(Error::not_found("organization", id));
        }
        store.organizations.retain(|o| o.id != id);
        Ok(())
    }

    fn list_organizations(&self) -> Result<Vec<Organization>> {
        Ok(self.call()?.organizations.clone())
    }

    fn create_device(&self, id: &str, request: &DeviceRequest) -> Result<Device> {
        let mut store = self.call()?;
        if store.devices.iter().any(|d| d.id == id) {
            return Err(Error::conflict("device", id, "already exists"));
        }
        let device = Device {
            id: id.to_string(),
            etag: store.etag(),
            display_name: request.display_name.clone(),
            template: request.template.clone(),
            simulated: request.simulated.unwrap_or(false),
            provisioned: false,
            enabled: request.enabled.unwrap_or(true),
            organizations: request.organizations.clone().unwrap_or_default(),
        };
        store.devices.push(device.clone());
        Ok(device)
    }

    fn get_device(&self, id: &str) -> Result<Device> {
        let store = self.call()?;
        store
            .devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found("device", id))
    }

    fn update_device(&self, id: &str, request: &DeviceRequest) -> Result<Device> {
        let mut store = self.call()?;
        let etag = store.etag();
        let device = store
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::not_found("device", id))?;
        device.etag = etag;
        device.display_name = request.display_name.clone();
        if let Some(template) = &request.template {
            device.template = Some(template.clone());
        }
        if let Some(simulated) = request.simulated {
            device.simulated = simulated;
        }
        if let Some(enabled) = request.enabled {
            device.enabled = enabled;
        }
        if let Some(organizations) = &request.organizations {
            device.organizations = organizations.clone();
        }
        Ok(device.clone())
    }

    fn delete_device(&self, id: &str) -> Result<()> {
        let mut store = self.call()?;
        if !store.devices.iter().any(|d| d.id == id) {
            return Err(Error::not_found("device", id));
        }
        store.devices.retain(|d| d.id != id);
        Ok(())
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        Ok(self.call()?.devices.clone())
    }

    fn new_user_id(&self) -> String {
        let mut store = self.lock();
        store.next_user += 1;
        format!("user-{}", store.next_user)
    }

    fn create_user(&self, id: &str, request: &UserRequest) -> Result<User> {
        let mut store = self.call()?;
        let taken = store.users.iter().any(|u| match u {
            AnyUser::Email(existing) => existing.email.eq_ignore_ascii_case(&request.email),
            _ => false,
        });
        if taken {
            return Err(Error::conflict("user", &request.email, "email already in use"));
        }
        match store.insert_user(AnyUser::Email(User {
            id: id.to_string(),
            email: request.email.clone(),
            roles: request.roles.clone(),
        }))? {
            AnyUser::Email(user) => Ok(user),
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn get_user(&self, id: &str) -> Result<User> {
        let store = self.call()?;
        match store.user(id, UserType::Email)? {
            AnyUser::Email(user) => Ok(user.clone()),
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn update_user(&self, id: &str, request: &UserRequest) -> Result<User> {
        let mut store = self.call()?;
        match store.user_mut(id, UserType::Email)? {
            AnyUser::Email(user) => {
                user.email = request.email.clone();
                user.roles = request.roles.clone();
                Ok(user.clone())
            }
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn delete_user(&self, id: &str) -> Result<()> {
        self.call()?.remove_user(id, UserType::Email)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let store = self.call()?;
        Ok(store
            .users
            .iter()
            .filter_map(|u| match u {
                AnyUser::Email(user) => Some(user.clone()),
                _ => None,
            })
            .collect())
    }

    fn create_ad_group_user(
        &self,
        id: &str,
        request: &AdGroupUserRequest,
    ) -> Result<AdGroupUser> {
        let mut store = self.call()?;
        match store.insert_user(AnyUser::AdGroup(AdGroupUser {
            id: id.to_string(),
            object_id: request.object_id.clone(),
            tenant_id: request.tenant_id.clone(),
            roles: request.roles.clone(),
        }))? {
            AnyUser::AdGroup(user) => Ok(user),
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn get_ad_group_user(&self, id: &str) -> Result<AdGroupUser> {
        let store = self.call()?;
        match store.user(id, UserType::AdGroup)? {
            AnyUser::AdGroup(user) => Ok(user.clone()),
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn update_ad_group_user(&self, id: &str, request: &AdGroupUserRequest) -> Result<AdGroupUser> {
        let mut store = self.call()?;
        match store.user_mut(id, UserType::AdGroup)? {
            AnyUser::AdGroup(user) => {
                user.object_id = request.object_id.clone();
                user.tenant_id = request.tenant_id.clone();
                user.roles = request.roles.clone();
                Ok(user.clone())
            }
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn delete_ad_group_user(&self, id: &str) -> Result<()> {
        self.call()?.remove_user(id, UserType::AdGroup)
    }

    fn list_ad_group_users(&self) -> Result<Vec<AdGroupUser>> {
        let store = self.call()?;
        Ok(store
            .users
            .iter()
            .filter_map(|u| match u {
                AnyUser::AdGroup(user) => Some(user.clone()),
                _ => None,
            })
            .collect())
    }

    fn create_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser> {
        let mut store = self.call()?;
        match store.insert_user(AnyUser::ServicePrincipal(ServicePrincipalUser {
            id: id.to_string(),
            object_id: request.object_id.clone(),
            tenant_id: request.tenant_id.clone(),
            roles: request.roles.clone(),
        }))? {
            AnyUser::ServicePrincipal(user) => Ok(user),
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn get_service_principal_user(&self, id: &str) -> Result<ServicePrincipalUser> {
        let store = self.call()?;
        match store.user(id, UserType::ServicePrincipal)? {
            AnyUser::ServicePrincipal(user) => Ok(user.clone()),
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn update_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser> {
        let mut store = self.call()?;
        match store.user_mut(id, UserType::ServicePrincipal)? {
            AnyUser::ServicePrincipal(user) => {
                user.object_id = request.object_id.clone();
                user.tenant_id = request.tenant_id.clone();
                user.roles = request.roles.clone();
                Ok(user.clone())
            }
            other => Err(Error::InvalidResponse(format!("unexpected user {other:?}"))),
        }
    }

    fn delete_service_principal_user(&self, id: &str) -> Result<()> {
        self.call()?.remove_user(id, UserType::ServicePrincipal)
    }

    fn list_service_principal_users(&self) -> Result<Vec<ServicePrincipalUser>> {
        let store = self.call()?;
        Ok(store
            .users
            .iter()
            .filter_map(|u| match u {
                AnyUser::ServicePrincipal(user) => Some(user.clone()),
                _ => None,
            })
            .collect())
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.call()?.roles.clone())
    }
}

/// Apply a JSON merge patch: `null` removes a field, objects merge
/// recursively and anything else replaces the target.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in fields {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoleAssignment;

    fn org_request(name: &str, parent: Option<&str>) -> OrganizationRequest {
        OrganizationRequest {
            display_name: name.to_string(),
            parent: parent.map(str::to_string),
        }
    }

    #[test]
    fn test_mock_create_organization_twice_conflicts() {
        let mock = MockClient::new();
        mock.create_organization("o1", &org_request("One", None))
            .unwrap();
        let err = mock
            .create_organization("o1", &org_request("One", None))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn test_mock_rejects_unknown_parent() {
        let mock = MockClient::new();
        let err = mock
            .create_organization("child", &org_request("Child", Some("missing")))
            .unwrap_err();
        assert!(matches!(err, Error::Http { status: Some(422), .. }));
    }

    #[test]
    fn test_mock_device_defaults() {
        let mock = MockClient::new();
        let device = mock
            .create_device(
                "d1",
                &DeviceRequest {
                    display_name: "Device".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(device.enabled);
        assert!(!device.simulated);
        assert!(!device.etag.is_empty());
    }

    #[test]
    fn test_mock_update_device_bumps_etag() {
        let mock = MockClient::new();
        let created = mock
            .create_device(
                "d1",
                &DeviceRequest {
                    display_name: "Device".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = mock
            .update_device(
                "d1",
                &DeviceRequest {
                    display_name: "Renamed".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_ne!(created.etag, updated.etag);
        assert_eq!(updated.display_name, "Renamed");
    }

    #[test]
    fn test_mock_user_ids_are_assigned() {
        let mock = MockClient::new();
        let id = mock.new_user_id();
        let user = mock
            .create_user(
                &id,
                &UserRequest {
                    email: "a@example.com".to_string(),
                    roles: vec![RoleAssignment::new("r1")],
                },
            )
            .unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(mock.get_user(&user.id).unwrap(), user);
        assert_eq!(mock.new_user_id(), "user-2");
    }

    #[test]
    fn test_mock_user_id_reuse_conflicts() {
        let mock = MockClient::new();
        let request = AdGroupUserRequest {
            object_id: "obj".to_string(),
            tenant_id: "tenant".to_string(),
            roles: vec![],
        };
        mock.create_ad_group_user("u1", &request).unwrap();
        let err = mock.create_ad_group_user("u1", &request).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(mock.list_ad_group_users().unwrap().len(), 1);
    }

    #[test]
    fn test_mock_update_without_parent_moves_to_root() {
        let mock = MockClient::new();
        mock.create_organization("p", &org_request("Parent", None))
            .unwrap();
        mock.create_organization("c", &org_request("Child", Some("p")))
            .unwrap();

        let updated = mock
            .update_organization("c", &org_request("Child", None))
            .unwrap();
        assert_eq!(updated.parent, None);
        assert_eq!(mock.get_organization("c").unwrap().parent, None);
    }

    #[test]
    fn test_merge_patch() {
        let mut target = serde_json::json!({ "a": 1, "b": { "c": 2, "d": 3 }, "e": 4 });
        merge_patch(
            &mut target,
            &serde_json::json!({ "a": 5, "b": { "c": null }, "e": null, "f": 6 }),
        );
        assert_eq!(target, serde_json::json!({ "a": 5, "b": { "d": 3 }, "f": 6 }));
    }

    #[test]
    fn test_mock_user_type_mismatch() {
        let mock = MockClient::new();
        let user = mock
            .create_ad_group_user(
                &mock.new_user_id(),
                &AdGroupUserRequest {
                    object_id: "obj".to_string(),
                    tenant_id: "tenant".to_string(),
                    roles: vec![],
                },
            )
            .unwrap();
        let err = mock.get_user(&user.id).unwrap_err();
        assert!(matches!(err, Error::UserTypeMismatch { .. }));
        assert!(mock.list_users().unwrap().is_empty());
        assert_eq!(mock.list_ad_group_users().unwrap().len(), 1);
    }

    #[test]
    fn test_mock_fail_next() {
        let mock = MockClient::new();
        mock.fail_next(Error::http("boom", Some(503)));
        assert!(mock.list_devices().is_err());
        assert!(mock.list_devices().is_ok());
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_mock_role_lookup_returns_canonical_name() {
        let mock = MockClient::with_builtin_roles();
        let role = mock.get_role_by_name("Org Administrator").unwrap();
        assert_eq!(role.display_name, "Org Admin");
        assert!(matches!(
            mock.get_role_by_name("Nobody"),
            Err(Error::RoleNotFound(_))
        ));
    }
}
