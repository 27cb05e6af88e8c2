//! `iotcentral_service_principal_user`: an AAD service principal granted access

use super::SharedClient;
use super::ad_group_user::aad_user_schema;
use super::roles::{self, RoleAssignmentModel};
use declarative::{ManagedResource, Schema};
use iotcentral_client::{Error, ServicePrincipalUser, ServicePrincipalUserRequest};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "iotcentral_service_principal_user";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicePrincipalUserModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<RoleAssignmentModel>>,
}

pub struct ServicePrincipalUserResource {
    client: SharedClient,
}

impl ServicePrincipalUserResource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl ManagedResource for ServicePrincipalUserResource {
    type Model = ServicePrincipalUserModel;
    type Request = ServicePrincipalUserRequest;
    type Record = ServicePrincipalUser;
    type Error = Error;

    const TYPE_NAME: &'static str = TYPE_NAME;
    const STAGE: u32 = 1;

    fn schema(&self) -> Schema {
        aad_user_schema("AAD object ID of the service principal")
    }

    fn plan_to_request(&self, planned: &ServicePrincipalUserModel) -> ServicePrincipalUserRequest {
        ServicePrincipalUserRequest {
            object_id: planned.object_id.clone().unwrap_or_default(),
            tenant_id: planned.tenant_id.clone().unwrap_or_default(),
            roles: roles::to_request(planned.roles.as_deref()),
        }
    }

    fn response_to_state(&self, record: ServicePrincipalUser) -> ServicePrincipalUserModel {
        ServicePrincipalUserModel {
            id: Some(record.id),
            object_id: Some(record.object_id),
            tenant_id: Some(record.tenant_id),
            roles: Some(roles::to_state(record.roles)),
        }
    }

    fn id_of(model: &ServicePrincipalUserModel) -> Option<&str> {
        model.id.as_deref()
    }

    fn with_id(id: &str) -> ServicePrincipalUserModel {
        ServicePrincipalUserModel {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn is_not_found(error: &Error) -> bool {
        error.is_not_found()
    }

    fn remote_create(
        &self,
        _planned: &ServicePrincipalUserModel,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser, Error> {
        let id = self.client.new_user_id();
        self.client.create_service_principal_user(&id, request)
    }

    fn remote_read(&self, id: &str) -> Result<ServicePrincipalUser, Error> {
        self.client.get_service_principal_user(id)
    }

    fn remote_update(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser, Error> {
        self.client.update_service_principal_user(id, request)
    }

    fn remote_delete(&self, id: &str) -> Result<(), Error> {
        self.client.delete_service_principal_user(id)
    }
}
