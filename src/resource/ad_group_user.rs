//! `iotcentral_ad_group_user`: an Azure AD group granted access to the application
//!
//! The group is identified by its AAD object and tenant IDs; pointing a
//! declaration at another group is a different user, so both replace.

use super::SharedClient;
use super::roles::{self, RoleAssignmentModel};
use declarative::{Attribute, ManagedResource, Schema};
use iotcentral_client::{AdGroupUser, AdGroupUserRequest, Error};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "iotcentral_ad_group_user";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdGroupUserModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<RoleAssignmentModel>>,
}

/// Schema shared by the AAD-backed user kinds; `object_id_description`
/// names what the object ID points at.
pub(super) fn aad_user_schema(object_id_description: &'static str) -> Schema {
    Schema::new()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("ID assigned by the application"),
        )
        .with_attribute(
            "object_id",
            Attribute::required_string()
                .requires_replace()
                .with_description(object_id_description),
        )
        .with_attribute(
            "tenant_id",
            Attribute::required_string()
                .requires_replace()
                .with_description("AAD tenant ID"),
        )
        .with_attribute("roles", roles::roles_attribute())
}

pub struct AdGroupUserResource {
    client: SharedClient,
}

impl AdGroupUserResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl ManagedResource for AdGroupUserResource {
    type Model = AdGroupUserModel;
    type Request = AdGroupUserRequest;
    type Record = AdGroupUser;
    type Error = Error;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const STAGE: u32 = 1;

    fn schema(&self) -> Schema {
        aad_user_schema("AAD object ID of the group")
    }

    fn plan_to_request(&self, planned: &AdGroupUserModel) -> AdGroupUserRequest {
        AdGroupUserRequest {
            object_id: planned.object_id.clone().unwrap_or_default(),
            tenant_id: planned.tenant_id.clone().unwrap_or_default(),
            roles: roles::to_request(planned.roles.as_deref()),
        }
    }

    fn response_to_state(&self, record: AdGroupUser) -> AdGroupUserModel {
        AdGroupUserModel {
            id: Some(record.id),
            object_id: Some(record.object_id),
            tenant_id: Some(record.tenant_id),
            roles: Some(roles::to_state(record.roles)),
        }
    }

    fn id_of(model: &AdGroupUserModel) -> Option<&str> {
        model.id.as_deref()
    }

    fn with_id(id: &str) -> AdGroupUserModel {
        AdGroupUserModel {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn is_not_found(error: &Error) -> bool {
        error.is_not_found()
    }

    fn remote_create(
        &self,
        _planned: &AdGroupUserModel,
        request: &AdGroupUserRequest,
    ) -> Result<AdGroupUser, Error> {
        let id = self.client.new_user_id();
        self.client.create_ad_group_user(&id, request)
    }

    fn remote_read(&self, id: &str) -> Result<AdGroupUser, Error> {
        self.client.get_ad_group_user(id)
    }

    fn remote_update(&self, id: &str, request: &AdGroupUserRequest) -> Result<AdGroupUser, Error> {
        self.client.update_ad_group_user(id, request)
    }

    fn remote_delete(&self, id: &str) -> Result<(), Error> {
        self.client.delete_ad_group_user(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, MissingPolicy, Registry, StateUpdate};
    use iotcentral_client::{Client, MockClient, ServicePrincipalUserRequest};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn setup() -> (Arc<MockClient>, Registry) {
        let mock = Arc::new(MockClient::new());
        let registry = Registry::new().with(AdGroupUserResource::new(mock.clone()));
        (mock, registry)
    }

    fn group(object_id: &str, tenant_id: &str) -> Value {
        json!({
            "object_id": object_id,
            "tenant_id": tenant_id,
            "roles": [{ "role": "operator", "organization": "north" }]
        })
    }

    fn create(registry: &Registry, config: &Value) -> Value {
        let diff = registry
            .diff("iotcentral_ad_group_user.g", TYPE_NAME, Some(config), None)
            .unwrap();
        match registry.require(TYPE_NAME).unwrap().apply(&diff).1 {
            StateUpdate::Set(state) => state,
            other => panic!("Expected Set, got {other:?}"),
        }
    }

    #[test]
    fn test_identity_changes_replace() {
        let (_, registry) = setup();
        let created = create(&registry, &group("obj", "tenant"));

        for (config, trigger) in [
            (group("other-obj", "tenant"), "object_id"),
            (group("obj", "other-tenant"), "tenant_id"),
        ] {
            let diff = registry
                .diff("iotcentral_ad_group_user.g", TYPE_NAME, Some(&config), Some(&created))
                .unwrap();
            assert_eq!(diff.action, Action::Replace);
            assert_eq!(diff.replace_triggers, vec![trigger.to_string()]);
        }
    }

    #[test]
    fn test_create_then_read_is_consistent() {
        let (_, registry) = setup();
        let created = create(&registry, &group("obj", "tenant"));
        let read = registry
            .require(TYPE_NAME)
            .unwrap()
            .refresh(&created, MissingPolicy::Error)
            .unwrap()
            .unwrap();
        assert_eq!(created, read);
        assert_eq!(
            read["roles"],
            json!([{ "role": "operator", "organization": "north" }])
        );
    }

    #[test]
    fn test_read_of_other_user_kind_fails() {
        let (mock, registry) = setup();
        let principal = mock
            .create_service_principal_user(
                &mock.new_user_id(),
                &ServicePrincipalUserRequest {
                    object_id: "sp".to_string(),
                    tenant_id: "tenant".to_string(),
                    roles: Vec::new(),
                },
            )
            .unwrap();

        let err = registry
            .require(TYPE_NAME)
            .unwrap()
            .import(&principal.id)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("failed to read iotcentral_ad_group_user {}", principal.id)
        );
    }

    #[test]
    fn test_missing_tenant_is_config_error() {
        let (mock, registry) = setup();
        let err = registry
            .diff(
                "iotcentral_ad_group_user.g",
                TYPE_NAME,
                Some(&json!({ "object_id": "obj", "roles": [] })),
                None,
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration for iotcentral_ad_group_user.g: tenant_id: required attribute is missing (AAD tenant ID)"
        );
        assert_eq!(mock.calls(), 0);
    }
}
