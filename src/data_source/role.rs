//! `iotcentral_role`: a role looked up by display name
//!
//! The result carries the name the application uses, which may differ from
//! the query ("Org Administrator" finds "Org Admin").

use crate::resource::SharedClient;
use declarative::{Attribute, DataSource, Schema};
use iotcentral_client::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoleQuery {
    pub display_name: Option<String>,
}

impl RoleQuery {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleState {
    pub id: String,
    pub display_name: String,
}

pub struct RoleDataSource {
    client: SharedClient,
}

impl RoleDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl DataSource for RoleDataSource {
    type Query = RoleQuery;
    type Output = RoleState;
    type Error = Error;

    const TYPE_NAME: &'static str = "iotcentral_role";

    fn schema(&self) -> Schema {
        Schema::new().with_attribute(
            "display_name",
            Attribute::required_string().with_description("Display name of the role"),
        )
    }

    fn describe(&self, query: &RoleQuery) -> String {
        format!("{:?}", query.display_name.as_deref().unwrap_or_default())
    }

    fn fetch(&self, query: &RoleQuery) -> Result<RoleState, Error> {
        let role = self
            .client
            .get_role_by_name(query.display_name.as_deref().unwrap_or_default())?;
        Ok(RoleState {
            id: role.id,
            display_name: role.display_name,
        })
    }
}
