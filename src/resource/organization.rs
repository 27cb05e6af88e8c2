//! `iotcentral_organization`: a node in the application's organization tree

use super::{SharedClient, required_id};
use declarative::{Attribute, ManagedResource, Schema};
use iotcentral_client::{Error, Organization, OrganizationRequest};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "iotcentral_organization";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

impl From<Organization> for OrganizationModel {
    fn from(record: Organization) -> Self {
        Self {
            id: Some(record.id),
            display_name: Some(record.display_name),
            parent: record.parent.filter(|p| !p.is_empty()),
        }
    }
}

pub struct OrganizationResource {
    client: SharedClient,
}

impl OrganizationResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl ManagedResource for OrganizationResource {
    type Model = OrganizationModel;
    type Request = OrganizationRequest;
    type Record = Organization;
    type Error = Error;

    const TYPE_NAME: &'static str = TYPE_NAME;

    fn schema(&self) -> Schema {
        Schema::new()
            .with_attribute(
                "id",
                Attribute::required_string()
                    .requires_replace()
                    .with_description("Unique ID of the organization"),
            )
            .with_attribute(
                "display_name",
                Attribute::required_string()
                    .use_state_for_unknown()
                    .with_description("Display name of the organization"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string()
                    .use_state_for_unknown()
                    .with_description("ID of the parent organization"),
            )
    }

    fn plan_to_request(&self, planned: &OrganizationModel) -> OrganizationRequest {
        OrganizationRequest {
            display_name: planned.display_name.clone().unwrap_or_default(),
            parent: planned.parent.clone().filter(|p| !p.is_empty()),
        }
    }

    fn response_to_state(&self, record: Organization) -> OrganizationModel {
        record.into()
    }

    fn id_of(model: &OrganizationModel) -> Option<&str> {
        model.id.as_deref()
    }

    fn with_id(id: &str) -> OrganizationModel {
        OrganizationModel {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn references(&self, model: &OrganizationModel) -> Vec<String> {
        model.parent.iter().cloned().collect()
    }

    fn is_not_found(error: &Error) -> bool {
        error.is_not_found()
    }

    fn remote_create(
        &self,
        planned: &OrganizationModel,
        request: &OrganizationRequest,
    ) -> Result<Organization, Error> {
        let id = required_id("organization", planned.id.as_deref())?;
        self.client.create_organization(id, request)
    }

    fn remote_read(&self, id: &str) -> Result<Organization, Error> {
        self.client.get_organization(id)
    }

    fn remote_update(
        &self,
        id: &str,
        request: &OrganizationRequest,
    ) -> Result<Organization, Error> {
        self.client.update_organization(id, request)
    }

    fn remote_delete(&self, id: &str) -> Result<(), Error> {
        self.client.delete_organization(id)
    }
}
