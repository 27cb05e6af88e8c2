//! Retry with exponential backoff as a decorator around a [`Client`].
//!
//! The reconciliation engine itself never retries. Operators who want
//! transient failures smoothed over wrap their client in a
//! [`RetryingClient`]; every call then goes through [`with_retry`].
//!
//! Creates are retried like everything else. Every create names its entity
//! up front (user IDs come from [`Client::new_user_id`] before the first
//! attempt), so a retry re-sends the same ID. If the first attempt reached
//! the application but its response was lost, the retry either lands on
//! the same entity or fails with a conflict; it never creates a second one.

use crate::client::Client;
use crate::error::{Error, Result};
use crate::types::{
    AdGroupUser, AdGroupUserRequest, Device, DeviceRequest, Organization, OrganizationRequest,
    Role, ServicePrincipalUser, ServicePrincipalUserRequest, User, UserRequest,
};
use std::thread;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_factor: f64,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// The result always lies between zero and `max_delay`; a negative
    /// factor yields no delay and a NaN factor yields `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let max = self.max_delay.as_secs_f64();
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        if delay.is_nan() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay.clamp(0.0, max))
    }

    /// Create a config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Whether this config ever makes more than one attempt.
    #[must_use]
    pub fn retries(&self) -> bool {
        self.max_attempts > 1
    }
}

/// Execute an operation, retrying retryable errors with exponential backoff.
///
/// Non-retryable errors are returned immediately. After the last attempt the
/// last error is returned.
pub fn with_retry<T, F>(config: &RetryConfig, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error: Option<Error> = None;

    for attempt in 0..attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                if attempt + 1 >= attempts {
                    last_error = Some(e);
                    break;
                }

                let delay = config.delay_for_attempt(attempt);
                log::warn!(
                    "{label}: attempt {}/{attempts} failed: {e}. Retrying in {}ms",
                    attempt + 1,
                    delay.as_millis()
                );
                thread::sleep(delay);

                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other("retry exhausted".to_string())))
}

/// A [`Client`] that retries transient failures of the wrapped client.
pub struct RetryingClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: Client> RetryingClient<C> {
    /// Wrap a client.
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// The retry configuration in effect.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// The wrapped client.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn run<T>(&self, label: &str, operation: impl FnMut() -> Result<T>) -> Result<T> {
        with_retry(&self.config, label, operation)
    }
}

impl<C: Client> Client for RetryingClient<C> {
    fn create_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization> {
        self.run("create organization", || {
            self.inner.create_organization(id, request)
        })
    }

    fn get_organization(&self, id: &str) -> Result<Organization> {
        self.run("get organization", || self.inner.get_organization(id))
    }

    fn update_organization(&self, id: &str, request: &OrganizationRequest) -> Result<Organization> {
        self.run("update organization", || {
            self.inner.update_organization(id, request)
        })
    }

    fn delete_organization(&self, id: &str) -> Result<()> {
        self.run("delete organization", || self.inner.delete_organization(id))
    }

    fn list_organizations(&self) -> Result<Vec<Organization>> {
        self.run("list organizations", || self.inner.list_organizations())
    }

    fn create_device(&self, id: &str, request: &DeviceRequest) -> Result<Device> {
        self.run("create device", || self.inner.create_device(id, request))
    }

    fn get_device(&self, id: &str) -> Result<Device> {
        self.run("get device", || self.inner.get_device(id))
    }

    fn update_device(&self, id: &str, request: &DeviceRequest) -> Result<Device> {
        self.run("update device", || self.inner.update_device(id, request))
    }

    fn delete_device(&self, id: &str) -> Result<()> {
        self.run("delete device", || self.inner.delete_device(id))
    }

    fn list_devices(&self) -> Result<Vec<Device>> {
        self.run("list devices", || self.inner.list_devices())
    }

    fn new_user_id(&self) -> String {
        self.inner.new_user_id()
    }

    fn create_user(&self, id: &str, request: &UserRequest) -> Result<User> {
        self.run("create user", || self.inner.create_user(id, request))
    }

    fn get_user(&self, id: &str) -> Result<User> {
        self.run("get user", || self.inner.get_user(id))
    }

    fn update_user(&self, id: &str, request: &UserRequest) -> Result<User> {
        self.run("update user", || self.inner.update_user(id, request))
    }

    fn delete_user(&self, id: &str) -> Result<()> {
        self.run("delete user", || self.inner.delete_user(id))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.run("list users", || self.inner.list_users())
    }

    fn create_ad_group_user(
        &self,
        id: &str,
        request: &AdGroupUserRequest,
    ) -> Result<AdGroupUser> {
        self.run("create AD group user", || {
            self.inner.create_ad_group_user(id, request)
        })
    }

    fn get_ad_group_user(&self, id: &str) -> Result<AdGroupUser> {
        self.run("get AD group user", || self.inner.get_ad_group_user(id))
    }

    fn update_ad_group_user(&self, id: &str, request: &AdGroupUserRequest) -> Result<AdGroupUser> {
        self.run("update AD group user", || {
            self.inner.update_ad_group_user(id, request)
        })
    }

    fn delete_ad_group_user(&self, id: &str) -> Result<()> {
        self.run("delete AD group user", || self.inner.delete_ad_group_user(id))
    }

    fn list_ad_group_users(&self) -> Result<Vec<AdGroupUser>> {
        self.run("list AD group users", || self.inner.list_ad_group_users())
    }

    fn create_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser> {
        self.run("create service principal user", || {
            self.inner.create_service_principal_user(id, request)
        })
    }

    fn get_service_principal_user(&self, id: &str) -> Result<ServicePrincipalUser> {
        self.run("get service principal user", || {
            self.inner.get_service_principal_user(id)
        })
    }

    fn update_service_principal_user(
        &self,
        id: &str,
        request: &ServicePrincipalUserRequest,
    ) -> Result<ServicePrincipalUser> {
        self.run("update service principal user", || {
            self.inner.update_service_principal_user(id, request)
        })
    }

    fn delete_service_principal_user(&self, id: &str) -> Result<()> {
        self.run("delete service principal user", || {
            self.inner.delete_service_principal_user(id)
        })
    }

    fn list_service_principal_users(&self) -> Result<Vec<ServicePrincipalUser>> {
        self.run("list service principal users", || {
            self.inner.list_service_principal_users()
        })
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        self.run("list roles", || self.inner.list_roles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_for_attempt() {
        let config = RetryConfig::new(5, Duration::from_secs(1), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(3),
            ..RetryConfig::new(5, Duration::from_secs(1), 2.0)
        };
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(3));
    }

    #[test]
    fn test_delay_with_unusable_factor_stays_in_range() {
        let negative = RetryConfig::new(3, Duration::from_secs(1), -2.0);
        assert_eq!(negative.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(negative.delay_for_attempt(2), Duration::from_secs(4));

        let nan = RetryConfig::new(3, Duration::from_secs(1), f64::NAN);
        assert_eq!(nan.delay_for_attempt(1), nan.max_delay);

        let infinite = RetryConfig::new(3, Duration::from_secs(1), f64::INFINITY);
        assert_eq!(infinite.delay_for_attempt(1), infinite.max_delay);
    }

    #[test]
    fn test_no_retry() {
        assert!(!RetryConfig::no_retry().retries());
        assert!(RetryConfig::default().retries());
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), "test", || {
            attempts.set(attempts.get() + 1);
            Err(Error::not_found("device", "d1"))
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Cell::new(0);
        let result = with_retry(&fast(3), "test", || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 {
                Err(Error::http("timeout", None))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Cell::new(0);
        let result: Result<()> = with_retry(&fast(3), "test", || {
            attempts.set(attempts.get() + 1);
            Err(Error::http("HTTP 503", Some(503)))
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_retrying_client_recovers_from_transient_failure() {
        let mock = MockClient::new();
        mock.fail_next(Error::http("HTTP 503", Some(503)));
        let client = RetryingClient::new(mock.clone(), fast(2));
        assert!(client.list_devices().unwrap().is_empty());
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_retried_user_create_keeps_its_id() {
        let mock = MockClient::new();
        mock.fail_next(Error::http("HTTP 503", Some(503)));
        let client = RetryingClient::new(mock.clone(), fast(3));

        let id = client.new_user_id();
        let user = client
            .create_service_principal_user(
                &id,
                &ServicePrincipalUserRequest {
                    object_id: "obj".to_string(),
                    tenant_id: "tenant".to_string(),
                    roles: vec![],
                },
            )
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(mock.calls(), 2);
        assert_eq!(mock.list_service_principal_users().unwrap(), vec![user]);
    }

    #[test]
    fn test_retrying_client_does_not_retry_conflicts() {
        let mock = MockClient::new();
        mock.fail_next(Error::conflict("device", "d1", "exists"));
        let client = RetryingClient::new(mock.clone(), fast(3));
        assert!(client.get_device("d1").is_err());
        assert_eq!(mock.calls(), 1);
    }
}
