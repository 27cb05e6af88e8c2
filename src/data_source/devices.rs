//! `iotcentral_devices`: every device, in the order the application returns them

use super::ListAll;
use crate::resource::SharedClient;
use crate::resource::device::DeviceModel;
use declarative::{DataSource, Schema};
use iotcentral_client::Error;

pub struct DevicesDataSource {
    client: SharedClient,
}

impl DevicesDataSource {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }
}

impl DataSource for DevicesDataSource {
    type Query = ListAll;
    type Output = Vec<DeviceModel>;
    type Error = Error;

    const TYPE_NAME: &'static str = "iotcentral_devices";

    fn schema(&self) -> Schema {
        Schema::new()
    }

    fn fetch(&self, _query: &ListAll) -> Result<Vec<DeviceModel>, Error> {
        Ok(self
            .client
            .list_devices()?
            .into_iter()
            .map(DeviceModel::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotcentral_client::{Client, DeviceRequest, MockClient};
    use std::sync::Arc;

    fn add_device(mock: &MockClient, id: &str, organizations: &[&str]) {
        mock.create_device(
            id,
            &DeviceRequest {
                display_name: id.to_uppercase(),
                organizations: Some(organizations.iter().map(|o| (*o).to_string()).collect()),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn test_lists_devices_in_remote_order() {
        let mock = Arc::new(MockClient::new());
        add_device(&mock, "zeta", &["north"]);
        add_device(&mock, "alpha", &[]);
        add_device(&mock, "mid", &["south"]);

        let source = DevicesDataSource::new(mock);
        let devices = declarative::data_source::read(&source, &ListAll {}).unwrap();
        let ids: Vec<&str> = devices.iter().filter_map(|d| d.id.as_deref()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(devices[0].organizations, Some(vec!["north".to_string()]));
    }

    #[test]
    fn test_empty_application() {
        let source = DevicesDataSource::new(Arc::new(MockClient::new()));
        assert!(declarative::data_source::read(&source, &ListAll {}).unwrap().is_empty());
    }

    #[test]
    fn test_failure_returns_no_partial_result() {
        let mock = Arc::new(MockClient::new());
        add_device(&mock, "d", &[]);
        mock.fail_next(Error::http("HTTP 500", Some(500)));

        let source = DevicesDataSource::new(mock);
        let err = declarative::data_source::read(&source, &ListAll {}).unwrap_err();
        assert_eq!(err.to_string(), "failed to read iotcentral_devices all");
    }
}
