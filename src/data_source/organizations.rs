//! `iotcentral_organizations`: every organization, in remote order

use super::ListAll;
use crate::resource::SharedClient;
use crate::resource::organization::OrganizationModel;
use declarative::{DataSource, Schema};
use iotcentral_client::Error;

pub struct OrganizationsDataSource {
    client: SharedClient,
}

impl OrganizationsDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl DataSource for OrganizationsDataSource {
    type Query = ListAll;
    type Output = Vec<OrganizationModel>;
    type Error = Error;

    const TYPE_NAME: &'static str = "iotcentral_organizations";

    fn schema(&self) -> Schema {
        Schema::new()
    }

    fn fetch(&self, _query: &ListAll) -> Result<Vec<OrganizationModel>, Error> {
        Ok(self
            .client
            .list_organizations()?
            .into_iter()
            .map(OrganizationModel::from)
            .collect())
    }
}
