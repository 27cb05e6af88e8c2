//! Blocking client for the Azure IoT Central REST API.
//!
//! Covers the entities the reconciler manages: organizations, devices,
//! email users, Azure AD group users, service principal users and roles.
//!
//! # Example
//!
//! ```no_run
//! use iotcentral_client::{Client, HttpClient};
//!
//! let client = HttpClient::new("myapp.azureiotcentral.com", "token").unwrap();
//! for device in client.list_devices().unwrap() {
//!     println!("{} {}", device.id, device.display_name);
//! }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod retry;
pub mod roles;
pub mod types;

pub use client::http::{HttpClient, base_url};
pub use client::{Client, MockClient};
pub use error::{Error, ErrorCategory, Result};
pub use retry::{RetryConfig, RetryingClient, with_retry};
pub use types::{
    API_VERSION, AdGroupUser, AdGroupUserRequest, AnyUser, Device, DeviceRequest, Organization,
    OrganizationPatch, OrganizationRequest, Role, RoleAssignment, ServicePrincipalUser,
    ServicePrincipalUserRequest, User, UserRequest, UserType,
};
