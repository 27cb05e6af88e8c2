//! HTTP client for a live IoT Central application.
//!
//! Requests go to `https://<host>/api/...?api-version=2022-07-31` with a
//! bearer token. The token is taken as given; acquiring and renewing it is
//! the caller's business.
//!
//! List endpoints are paged by the application (`nextLink`); the client
//! follows every page so callers always see the complete set.

use super::Client;
use crate::error::{Error, Result};
use crate::types::{
    API_VERSION, AdGroupUser, AdGroupUserRequest, AnyUser, Device, DeviceRequest, Organization,
    OrganizationPatch, OrganizationRequest, Role, ServicePrincipalUser, ServicePrincipalUserRequest,
    User, UserRequest, UserType,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on pages followed for a single list call.
const MAX_PAGES: usize = 1000;

/// Blocking client for the IoT Central REST API.
pub struct HttpClient {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Application base URL, without trailing slash.
    base_url: String,
    /// Value of the Authorization header.
    authorization: String,
}

impl HttpClient {
    /// Create a client for an application host and bearer token.
    ///
    /// `host` may be a bare host name (`myapp.azureiotcentral.com`) or a URL.
    pub fn new(host: &str, token: &str) -> Result<Self> {
        let base_url = base_url(host)?;
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        // Status codes are turned into errors by hand so the body's error
        // message can be kept.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();

        Ok(Self {
            agent: config.into(),
            base_url,
            authorization: format!("Bearer {}", token.trim()),
        })
    }

    /// Get the application base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, versioned: bool) -> Result<T> {
        let mut request = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json");
        if versioned {
            request = request.query("api-version", API_VERSION);
        }
        let response = request.call()?;
        read_json(response)
    }

    fn put_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .agent
            .put(url)
            .query("api-version", API_VERSION)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .send_json(body)?;
        read_json(response)
    }

    fn patch_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .agent
            .patch(url)
            .query("api-version", API_VERSION)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .send_json(body)?;
        read_json(response)
    }

    fn delete(&self, url: &str) -> Result<()> {
        let response = self
            .agent
            .delete(url)
            .query("api-version", API_VERSION)
            .header("Authorization", &self.authorization)
            .call()?;
        check_status(response).map(|_| ())
    }

    /// Fetch every page of a collection.
    fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Page<T> = self.get_json(&self.url(path), true)?;
        for _ in 0..MAX_PAGES {
            items.append(&mut page.value);
            match page.next_link.take() {
                Some(next) => page = self.get_json(&next, false)?,
                None => return Ok(items),
            }
        }
        Err(Error::InvalidResponse(format!(
            "{path}: more than {MAX_PAGES} pages"
        )))
    }

    fn get_any_user(&self, id: &str, expected: UserType) -> Result<AnyUser> {
        let user: AnyUser = self
            .get_json(&self.url(&format!("users/{id}")), true)
            .map_err(|e| e.for_entity("user", id))?;
        if user.user_type() != expected {
            return Err(Error::UserTypeMismatch {
                id: id.to_string(),
                expected: expected.as_str(),
                actual: user.user_type().to_string(),
            });
        }
        Ok(user)
    }

    fn put_user(&self, id: &str, body: &UserBody<'_>) -> Result<AnyUser> {
        self.put_json(&self.url(&format!("users/{id}")), body)
            .map_err(|e| e.for_entity("user", id))
    }

    fn patch_user(&self, id: &str, body: &UserBody<'_>) -> Result<AnyUser> {
        self.patch_json(&self.url(&format!("users/{id}")), body)
            .map_err(|e| e.for_entity("user", id))
    }

    fn delete_any_user(&self, id: &str) -> Result<()> {
        self.delete(&self.url(&format!("users/{id}")))
            .map_err(|e| e.for_entity("user", id))
    }

    fn list_any_users(&self) -> Result<Vec<AnyUser>> {
        self.list_all("users")
    }
}

impl Client for HttpClient {
    fn create_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization> {
        self.put_json(&self.url(&format!("organizations/{id}")), request)
            .map_err(|e| e.for_entity("organization", id))
    }

    fn get_organization(&self, id: &str) -> Result<Organization> {
        self.get_json(&self.url(&format!("organizations/{id}")), true)
            .map_err(|e| e.for_entity("organization", id))
    }

    fn update_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization> {
        let patch = OrganizationPatch::from(request);
        self.patch_json(&self.url(&format!("organizations/{id}")), &patch)
            .map_err(|e| e.for_entity("organization", id))
    }

    fn delete_organization(&self, id: &str) -> Result<()> {
        self.delete(&self.url(&format!("organizations/{id}")))
            .map_err(|e| e.for_entity("organization", id))
    }

    fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.list_all("organizations")
    }

    fn create_device(&self, id: &str, request: &DeviceRequest) -> Result<Device> {
        self.put_json(&self.url(&format!("devices/{id}")), request)
            .map_err(|e| e.for_entity("device", id))
    }

    fn get_device(&self, id: &str) -> Result<Device> {
        self.get_json(&self.url(&format!("devices/{id}")), true)
            .map_err(|e| e.for_entity("device", id))
    }

    fn update_device(&self, id: &str, request: &DeviceRequest) -> Result<Device> {
        self.patch_json(&self.url(&format!("devices/{id}")), request)
            .map_err(|e| e.for_entity("device", id))
    }

    fn delete_device(&self, id: &str) -> Result<()> {
        self.delete(&self.url(&format!("devices/{id}")))
            .map_err(|e| e.for_entity("device", id))
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        self.list_all("devices")
    }

    fn create_user(&self, id: &str, request: &UserRequest) -> Result<User> {
        match self.put_user(id, &UserBody::Email(request))? {
            AnyUser::Email(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::Email)),
        }
    }

    fn get_user(&self, id: &str) -> Result<User> {
        match self.get_any_user(id, UserType::Email)? {
            AnyUser::Email(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::Email)),
        }
    }

    fn update_user(&self, id: &str, request: &UserRequest) -> Result<User> {
        match self.patch_user(id, &UserBody::Email(request))? {
            AnyUser::Email(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::Email)),
        }
    }

    fn delete_user(&self, id: &str) -> Result<()> {
        self.delete_any_user(id)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self
            .list_any_users()?
            .into_iter()
            .filter_map(|u| match u {
                AnyUser::Email(user) => Some(user),
                _ => None,
            })
            .collect())
    }

    fn create_ad_group_user(
        &self,
        id: &str,
        request: &AdGroupUserRequest,
    ) -> Result<AdGroupUser> {
        match self.put_user(id, &UserBody::AdGroup(request))? {
            AnyUser::AdGroup(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::AdGroup)),
        }
    }

    fn get_ad_group_user(&self, id: &str) -> Result<AdGroupUser> {
        match self.get_any_user(id, UserType::AdGroup)? {
            AnyUser::AdGroup(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::AdGroup)),
        }
    }

    fn update_ad_group_user(&self, id: &str, request: &AdGroupUserRequest) -> Result<AdGroupUser> {
        match self.patch_user(id, &UserBody::AdGroup(request))? {
            AnyUser::AdGroup(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::AdGroup)),
        }
    }

    fn delete_ad_group_user(&self, id: &str) -> Result<()> {
        self.delete_any_user(id)
    }

    fn list_ad_group_users(&self) -> Result<Vec<AdGroupUser>> {
        Ok(self
            .list_any_users()?
            .into_iter()
            .filter_map(|u| match u {
                AnyUser::AdGroup(user) => Some(user),
                _ => None,
            })
            .collect())
    }

    fn create_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser> {
        match self.put_user(id, &UserBody::ServicePrincipal(request))? {
            AnyUser::ServicePrincipal(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::ServicePrincipal)),
        }
    }

    fn get_service_principal_user(&self, id: &str) -> Result<ServicePrincipalUser> {
        match self.get_any_user(id, UserType::ServicePrincipal)? {
            AnyUser::ServicePrincipal(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::ServicePrincipal)),
        }
    }

    fn update_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser> {
        match self.patch_user(id, &UserBody::ServicePrincipal(request))? {
            AnyUser::ServicePrincipal(user) => Ok(user),
            other => Err(unexpected_type(&other, UserType::ServicePrincipal)),
        }
    }

    fn delete_service_principal_user(&self, id: &str) -> Result<()> {
        self.delete_any_user(id)
    }

    fn list_service_principal_users(&self) -> Result<Vec<ServicePrincipalUser>> {
        Ok(self
            .list_any_users()?
            .into_iter()
            .filter_map(|u| match u {
                AnyUser::ServicePrincipal(user) => Some(user),
                _ => None,
            })
            .collect())
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        self.list_all("roles")
    }
}

/// Turn a host setting into a base URL.
///
/// A bare host name gets `https://`; a trailing slash is dropped.
pub fn base_url(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(Error::InvalidHost(host.to_string()));
    }
    if host.starts_with("https://") || host.starts_with("http://") {
        Ok(host.to_string())
    } else {
        Ok(format!("https://{host}"))
    }
}

fn check_status(
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<ureq::http::Response<ureq::Body>> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(Error::http(error_message(status, &body), Some(status)))
}

fn read_json<T: DeserializeOwned>(response: ureq::http::Response<ureq::Body>) -> Result<T> {
    let mut response = check_status(response)?;
    let body = response.body_mut().read_to_string()?;
    Ok(serde_json::from_str(&body)?)
}

/// Pull the application's error message out of a failure body.
fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail { code, message },
        }) => match code {
            Some(code) => format!("HTTP {status} {code}: {message}"),
            None => format!("HTTP {status}: {message}"),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

fn unexpected_type(user: &AnyUser, expected: UserType) -> Error {
    Error::UserTypeMismatch {
        id: user.id().to_string(),
        expected: expected.as_str(),
        actual: user.user_type().to_string(),
    }
}

// =============================================================================
// API response and request envelopes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum UserBody<'a> {
    #[serde(rename = "email")]
    Email(&'a UserRequest),
    #[serde(rename = "adGroup")]
    AdGroup(&'a AdGroupUserRequest),
    #[serde(rename = "servicePrincipal")]
    ServicePrincipal(&'a ServicePrincipalUserRequest),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoleAssignment;

    #[test]
    fn test_base_url_adds_scheme() {
        assert_eq!(
            base_url("myapp.azureiotcentral.com").unwrap(),
            "https://myapp.azureiotcentral.com"
        );
    }

    #[test]
    fn test_base_url_keeps_scheme_and_trims_slash() {
        assert_eq!(
            base_url("http://localhost:8080/").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_base_url_rejects_empty() {
        assert!(matches!(base_url("  "), Err(Error::InvalidHost(_))));
    }

    #[test]
    fn test_new_requires_token() {
        assert!(matches!(
            HttpClient::new("myapp.azureiotcentral.com", ""),
            Err(Error::MissingToken)
        ));
    }

    #[test]
    fn test_url_layout() {
        let client = HttpClient::new("myapp.azureiotcentral.com", "tok").unwrap();
        assert_eq!(
            client.url("devices/d1"),
            "https://myapp.azureiotcentral.com/api/devices/d1"
        );
    }

    #[test]
    fn test_error_message_from_body() {
        let body = r#"{"error":{"code":"NotFound","message":"Device not found"}}"#;
        assert_eq!(error_message(404, body), "HTTP 404 NotFound: Device not found");
        assert_eq!(error_message(500, ""), "HTTP 500");
        assert_eq!(error_message(502, "bad gateway"), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_user_body_is_tagged() {
        let request = UserRequest {
            email: "a@example.com".to_string(),
            roles: vec![RoleAssignment::new("r1")],
        };
        let json = serde_json::to_value(UserBody::Email(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "email",
                "email": "a@example.com",
                "roles": [{ "role": "r1" }]
            })
        );
    }

    #[test]
    fn test_organization_update_clears_parent() {
        let request = OrganizationRequest {
            display_name: "C".to_string(),
            parent: None,
        };
        assert_eq!(
            serde_json::to_value(OrganizationPatch::from(&request)).unwrap(),
            serde_json::json!({ "displayName": "C", "parent": null })
        );
        // Creates still omit an unset parent.
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "displayName": "C" })
        );
    }

    #[test]
    fn test_user_ids_are_unique() {
        let client = HttpClient::new("myapp.azureiotcentral.com", "tok").unwrap();
        let first = client.new_user_id();
        assert_eq!(first.len(), 36);
        assert_ne!(first, client.new_user_id());
    }

    #[test]
    fn test_page_next_link() {
        let page: Page<Role> = serde_json::from_str(
            r#"{"value":[{"id":"r1","displayName":"Administrator"}],"nextLink":"https://x/next"}"#,
        )
        .unwrap();
        assert_eq!(page.value.len(), 1);
        assert_eq!(page.next_link.as_deref(), Some("https://x/next"));
    }
}
