//! `iotcentral_user`: a user identified by email address

use super::SharedClient;
use super::roles::{self, RoleAssignmentModel};
use declarative::{Attribute, ManagedResource, Schema};
use iotcentral_client::{Error, User, UserRequest};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "iotcentral_user";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<RoleAssignmentModel>>,
}

pub struct UserResource {
    client: SharedClient,
}

impl UserResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl ManagedResource for UserResource {
    type Model = UserModel;
    type Request = UserRequest;
    type Record = User;
    type Error = Error;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const STAGE: u32 = 1;

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("ID assigned by the application"),
            )
            .with_attribute(
                "email",
                Attribute::required_string()
                    .requires_replace()
                    .with_description("Email address of the user"),
            )
            .with_attribute("roles", roles::roles_attribute())
    }

    fn plan_to_request(&self, planned: &UserModel) -> UserRequest {
        UserRequest {
            email: planned.email.clone().unwrap_or_default(),
            roles: roles::to_request(planned.roles.as_deref()),
        }
    }

    fn response_to_state(&self, record: User) -> UserModel {
        UserModel {
            id: Some(record.id),
            email: Some(record.email),
            roles: Some(roles::to_state(record.roles)),
        }
    }

    fn id_of(model: &UserModel) -> Option<&str> {
        model.id.as_deref()
    }

    fn with_id(id: &str) -> UserModel {
        UserModel {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn is_not_found(error: &Error) -> bool {
        error.is_not_found()
    }

    fn remote_create(&self, _planned: &UserModel, request: &UserRequest) -> Result<User, Error> {
        let id = self.client.new_user_id();
        self.client.create_user(&id, request)
    }

    fn remote_read(&self, id: &str) -> Result<User, Error> {
        self.client.get_user(id)
    }

    fn remote_update(&self, id: &str, request: &UserRequest) -> Result<User, Error> {
        self.client.update_user(id, request)
    }

    fn remote_delete(&self, id: &str) -> Result<(), Error> {
        self.client.delete_user(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, ApplyResult, MissingPolicy, Registry, StateUpdate};
    use iotcentral_client::{Client, MockClient, RetryConfig, RetryingClient};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Arc<MockClient>, Registry) {
        let mock = Arc::new(MockClient::with_builtin_roles());
        let registry = Registry::new().with(UserResource::new(mock.clone()));
        (mock, registry)
    }

    fn plan(
        registry: &Registry,
        config: &Value,
        prior: Option<&Value>,
    ) -> declarative::ResourceDiff {
        registry
            .diff("iotcentral_user.ops", TYPE_NAME, Some(config), prior)
            .unwrap()
    }

    fn apply(registry: &Registry, diff: &declarative::ResourceDiff) -> (ApplyResult, Value) {
        match registry.require(TYPE_NAME).unwrap().apply(diff) {
            (result, StateUpdate::Set(state)) => (result, state),
            other => panic!("Expected Set, got {other:?}"),
        }
    }

    #[test]
    fn test_create_assigns_id() {
        let (_, registry) = setup();
        let config = json!({ "email": "ops@example.com", "roles": [{ "role": "admin" }] });
        let diff = plan(&registry, &config, None);
        assert_eq!(diff.action, Action::Create);
        assert!(diff.unknown.contains("id"));

        let (result, state) = apply(&registry, &diff);
        assert_eq!(result, ApplyResult::Created);
        assert_eq!(state["id"], json!("user-1"));
        assert_eq!(state["roles"], json!([{ "role": "admin", "organization": null }]));
    }

    #[test]
    fn test_id_cannot_be_declared() {
        let (_, registry) = setup();
        let err = registry
            .diff(
                "iotcentral_user.ops",
                TYPE_NAME,
                Some(&json!({ "id": "mine", "email": "a@b.c", "roles": [] })),
                None,
            )
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_reordered_roles_are_noop() {
        let (_, registry) = setup();
        let config = json!({
            "email": "ops@example.com",
            "roles": [
                { "role": "operator", "organization": "north" },
                { "role": "admin" }
            ]
        });
        let (_, state) = apply(&registry, &plan(&registry, &config, None));

        let reordered = json!({
            "email": "ops@example.com",
            "roles": [
                { "role": "admin" },
                { "role": "operator", "organization": "north" }
            ]
        });
        assert_eq!(plan(&registry, &reordered, Some(&state)).action, Action::NoOp);
    }

    #[test]
    fn test_role_change_updates_same_user() {
        let (mock, registry) = setup();
        let config = json!({ "email": "ops@example.com", "roles": [{ "role": "admin" }] });
        let (_, created) = apply(&registry, &plan(&registry, &config, None));

        let changed = json!({
            "email": "ops@example.com",
            "roles": [{ "role": "operator", "organization": "north" }]
        });
        let diff = plan(&registry, &changed, Some(&created));
        assert_eq!(diff.action, Action::Update);
        assert_eq!(diff.id.as_deref(), Some("user-1"));

        let (result, updated) = apply(&registry, &diff);
        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(updated["id"], json!("user-1"));
        assert_eq!(
            mock.get_user("user-1").unwrap().roles[0].organization.as_deref(),
            Some("north")
        );
    }

    #[test]
    fn test_email_change_replaces() {
        let (mock, registry) = setup();
        let config = json!({ "email": "old@example.com", "roles": [{ "role": "admin" }] });
        let (_, created) = apply(&registry, &plan(&registry, &config, None));

        let changed = json!({ "email": "new@example.com", "roles": [{ "role": "admin" }] });
        let diff = plan(&registry, &changed, Some(&created));
        assert_eq!(diff.action, Action::Replace);
        assert_eq!(diff.replace_triggers, vec!["email"]);

        let (result, replaced) = apply(&registry, &diff);
        assert_eq!(result, ApplyResult::Replaced);
        assert_eq!(replaced["id"], json!("user-2"));
        assert!(mock.get_user("user-1").is_err());
    }

    #[test]
    fn test_create_retried_after_transient_failure_makes_one_user() {
        let mock = MockClient::with_builtin_roles();
        mock.fail_next(iotcentral_client::Error::http("HTTP 503", Some(503)));
        let client = RetryingClient::new(
            mock.clone(),
            RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                backoff_factor: 1.0,
                max_delay: Duration::from_millis(1),
            },
        );
        let registry = Registry::new().with(UserResource::new(Arc::new(client)));

        let config = json!({ "email": "ops@example.com", "roles": [{ "role": "admin" }] });
        let (result, state) = apply(&registry, &plan(&registry, &config, None));
        assert_eq!(result, ApplyResult::Created);

        let users = mock.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(state["id"], json!(users[0].id));
        assert_eq!(users[0].id, "user-1");
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let (_, registry) = setup();
        let config = json!({ "email": "ops@example.com", "roles": [{ "role": "admin" }] });
        let (_, created) = apply(&registry, &plan(&registry, &config, None));

        let resource = registry.require(TYPE_NAME).unwrap();
        let first = resource.refresh(&created, MissingPolicy::Error).unwrap().unwrap();
        let second = resource.refresh(&first, MissingPolicy::Error).unwrap().unwrap();
        assert_eq!(first, created);
        assert_eq!(first, second);
    }

    #[test]
    fn test_import_reads_everything_from_remote() {
        let (mock, registry) = setup();
        let user = mock
            .create_user(
                &mock.new_user_id(),
                &UserRequest {
                    email: "existing@example.com".to_string(),
                    roles: vec![iotcentral_client::RoleAssignment::new("admin")],
                },
            )
            .unwrap();

        let state = registry.require(TYPE_NAME).unwrap().import(&user.id).unwrap();
        assert_eq!(state["email"], json!("existing@example.com"));
        assert_eq!(state["id"], json!(user.id));
    }
}
