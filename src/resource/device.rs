//! `iotcentral_device`: a device registered in the application
//!
//! Most device attributes are optional+computed: left unset, the application
//! picks a value (enabled, simulated, template) and the state keeps whatever
//! it answered. `provisioned` is reported by the application only.
//!
//! The `etag` is read back into state but never sent on update, so updates
//! are last-writer-wins.

use super::{SharedClient, required_id};
use declarative::{Attribute, AttributeType, ManagedResource, Mutability, Schema};
use iotcentral_client::{Device, DeviceRequest, Error};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "iotcentral_device";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub simulated: Option<bool>,
    #[serde(default)]
    pub provisioned: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub organizations: Option<Vec<String>>,
}

impl From<Device> for DeviceModel {
    fn from(record: Device) -> Self {
        Self {
            id: Some(record.id),
            etag: Some(record.etag),
            display_name: Some(record.display_name),
            template: record.template.filter(|t| !t.is_empty()),
            simulated: Some(record.simulated),
            provisioned: Some(record.provisioned),
            enabled: Some(record.enabled),
            organizations: Some(record.organizations),
        }
    }
}

pub struct DeviceResource {
    client: SharedClient,
}

impl DeviceResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl ManagedResource for DeviceResource {
    type Model = DeviceModel;
    type Request = DeviceRequest;
    type Record = Device;
    type Error = Error;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const STAGE: u32 = 1;

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                "id",
                Attribute::required_string()
                    .requires_replace()
                    .with_description("Unique ID of the device"),
            )
            .with_attribute(
                "etag",
                Attribute::optional_computed_string().with_description("ETag of the device record"),
            )
            .with_attribute(
                "display_name",
                Attribute::required_string()
                    .use_state_for_unknown()
                    .with_description("Display name of the device"),
            )
            .with_attribute(
                "template",
                Attribute::optional_computed_string()
                    .use_state_for_unknown()
                    .with_description("ID of the device template"),
            )
            .with_attribute(
                "simulated",
                Attribute::optional_computed_bool()
                    .use_state_for_unknown()
                    .with_description("Whether the device is simulated"),
            )
            .with_attribute(
                "provisioned",
                Attribute::computed_bool()
                    .use_state_for_unknown()
                    .with_description("Whether resources have been allocated for the device"),
            )
            .with_attribute(
                "enabled",
                Attribute::optional_computed_bool()
                    .use_state_for_unknown()
                    .with_description("Whether the device may connect"),
            )
            .with_attribute(
                "organizations",
                Attribute::new(
                    AttributeType::List(Box::new(AttributeType::String)),
                    Mutability::OptionalComputed,
                )
                .with_description("IDs of the organizations the device belongs to"),
            )
    }

    fn plan_to_request(&self, planned: &DeviceModel) -> DeviceRequest {
        DeviceRequest {
            display_name: planned.display_name.clone().unwrap_or_default(),
            template: planned.template.clone(),
            simulated: planned.simulated,
            enabled: planned.enabled,
            organizations: planned.organizations.clone(),
        }
    }

    fn response_to_state(&self, record: Device) -> DeviceModel {
        record.into()
    }

    fn id_of(model: &DeviceModel) -> Option<&str> {
        model.id.as_deref()
    }

    fn with_id(id: &str) -> DeviceModel {
        DeviceModel {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn is_not_found(error: &Error) -> bool {
        error.is_not_found()
    }

    fn remote_create(
        &self,
        planned: &DeviceModel,
        request: &DeviceRequest,
    ) -> Result<Device, Error> {
        let id = required_id("device", planned.id.as_deref())?;
        self.client.create_device(id, request)
    }

    fn remote_read(&self, id: &str) -> Result<Device, Error> {
        self.client.get_device(id)
    }

    fn remote_update(&self, id: &str, request: &DeviceRequest) -> Result<Device, Error> {
        self.client.update_device(id, request)
    }

    fn remote_delete(&self, id: &str) -> Result<(), Error> {
        self.client.delete_device(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Action, ApplyResult, MissingPolicy, Registry, StateUpdate, lifecycle};
    use iotcentral_client::{Client, MockClient};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn setup() -> (Arc<MockClient>, Registry) {
        let mock = Arc::new(MockClient::new());
        let registry = Registry::new().with(DeviceResource::new(mock.clone()));
        (mock, registry)
    }

    fn apply(registry: &Registry, config: Value, prior: Option<&Value>) -> (Action, Value) {
        let diff = registry
            .diff("iotcentral_device.test", TYPE_NAME, Some(&config), prior)
            .unwrap();
        let (result, state) = registry.require(TYPE_NAME).unwrap().apply(&diff);
        assert!(result.is_success(), "{result:?}");
        match state {
            StateUpdate::Set(state) => (diff.action, state),
            other => panic!("Expected Set, got {other:?}"),
        }
    }

    #[test]
    fn test_create_fills_computed_attributes() {
        let (_, registry) = setup();
        let (action, state) = apply(
            &registry,
            json!({ "id": "test_id_1", "display_name": "test_1" }),
            None,
        );
        assert_eq!(action, Action::Create);
        assert_eq!(state["enabled"], json!(true));
        assert_eq!(state["simulated"], json!(false));
        assert_eq!(state["provisioned"], json!(false));
        assert_eq!(state["organizations"], json!([]));
        assert_eq!(state["etag"], json!("\"1\""));
    }

    #[test]
    fn test_rename_keeps_id() {
        let (mock, registry) = setup();
        let (_, created) = apply(
            &registry,
            json!({ "id": "test_id_1", "display_name": "test_1" }),
            None,
        );
        let (action, updated) = apply(
            &registry,
            json!({ "id": "test_id_1", "display_name": "test_1_name_updated" }),
            Some(&created),
        );
        assert_eq!(action, Action::Update);
        assert_eq!(updated["id"], json!("test_id_1"));
        assert_eq!(updated["display_name"], json!("test_1_name_updated"));
        assert_ne!(updated["etag"], created["etag"]);
        assert_eq!(mock.list_devices().unwrap().len(), 1);
    }

    #[test]
    fn test_unchanged_declaration_is_noop() {
        let (_, registry) = setup();
        let config = json!({ "id": "d", "display_name": "d", "organizations": [] });
        let (_, created) = apply(&registry, config.clone(), None);
        let diff = registry
            .diff("iotcentral_device.test", TYPE_NAME, Some(&config), Some(&created))
            .unwrap();
        assert_eq!(diff.action, Action::NoOp);
    }

    #[test]
    fn test_remote_drift_is_planned_back() {
        let (mock, registry) = setup();
        let config = json!({ "id": "d", "display_name": "d", "enabled": true });
        let (_, created) = apply(&registry, config.clone(), None);

        mock.edit_device("d", |device| device.enabled = false);
        let refreshed = registry
            .require(TYPE_NAME)
            .unwrap()
            .refresh(&created, MissingPolicy::Error)
            .unwrap()
            .unwrap();
        assert_eq!(refreshed["enabled"], json!(false));

        let (action, state) = apply(&registry, config, Some(&refreshed));
        assert_eq!(action, Action::Update);
        assert_eq!(state["enabled"], json!(true));
    }

    #[test]
    fn test_provisioned_cannot_be_declared() {
        let (_, registry) = setup();
        let err = registry
            .diff(
                "iotcentral_device.test",
                TYPE_NAME,
                Some(&json!({ "id": "d", "display_name": "d", "provisioned": true })),
                None,
            )
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("provisioned"));
    }

    #[test]
    fn test_organizations_keep_declared_order() {
        let (_, registry) = setup();
        let (_, state) = apply(
            &registry,
            json!({ "id": "d", "display_name": "d", "organizations": ["b", "a"] }),
            None,
        );
        assert_eq!(state["organizations"], json!(["b", "a"]));
    }

    #[test]
    fn test_unknown_values_are_left_out_of_request() {
        let resource = DeviceResource::new(Arc::new(MockClient::new()));
        let request = resource.plan_to_request(&DeviceModel {
            id: Some("d".to_string()),
            display_name: Some("d".to_string()),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({ "displayName": "d" })
        );
    }

    #[test]
    fn test_create_then_read_is_consistent() {
        let mock = Arc::new(MockClient::new());
        let resource = DeviceResource::new(mock);
        let created = lifecycle::create(
            &resource,
            &DeviceModel {
                id: Some("d".to_string()),
                display_name: Some("d".to_string()),
                organizations: Some(vec!["org".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
        let read = lifecycle::read(&resource, &created, MissingPolicy::Error)
            .unwrap()
            .unwrap();
        assert_eq!(created, read);
    }

    #[test]
    fn test_failed_delete_keeps_state() {
        let (mock, registry) = setup();
        let (_, created) = apply(&registry, json!({ "id": "d", "display_name": "d" }), None);
        let diff = registry
            .diff("iotcentral_device.test", TYPE_NAME, None, Some(&created))
            .unwrap();
        assert_eq!(diff.action, Action::Delete);

        mock.fail_next(Error::http("service unavailable", Some(503)));
        let (result, state) = registry.require(TYPE_NAME).unwrap().apply(&diff);
        assert!(matches!(result, ApplyResult::Failed { .. }));
        assert_eq!(state, StateUpdate::Unchanged);
        assert!(mock.get_device("d").is_ok());
    }
}
