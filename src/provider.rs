//! Provider bootstrap: application host, bearer token and the shared client
//!
//! The token is taken from `IOTCENTRAL_TOKEN` or, failing that, from the
//! Azure CLI's logged-in identity. It is used as-is; a long-running apply
//! that outlives the token fails with an authorization error.

use crate::config::{ProviderConfig, RetrySettings};
use crate::resource::SharedClient;
use anyhow::{Context, Result};
use declarative::MissingPolicy;
use iotcentral_client::{HttpClient, RetryConfig, RetryingClient};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

pub const HOST_ENV: &str = "IOTCENTRAL_HOST";
pub const TOKEN_ENV: &str = "IOTCENTRAL_TOKEN";

/// Resource the access token is issued for
pub const TOKEN_RESOURCE: &str = "https://apps.azureiotcentral.com";

/// OAuth scope of the access token
pub const TOKEN_SCOPE: &str = "https://apps.azureiotcentral.com/.default";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(
        "No IoT Central application configured\n  Set `host` in the [provider] table or the IOTCENTRAL_HOST environment variable"
    )]
    MissingHost,

    #[error(transparent)]
    InvalidHost(iotcentral_client::Error),

    #[error(
        "Could not acquire an access token: {0}\n  Run `az login`, or set IOTCENTRAL_TOKEN to a token for https://apps.azureiotcentral.com/.default"
    )]
    Token(String),
}

/// A configured connection to one application
pub struct Provider {
    pub host: String,
    pub client: SharedClient,
    pub missing_on_read: MissingPolicy,
}

impl Provider {
    /// Resolve host and token, and build the shared client
    pub fn connect(config: &ProviderConfig) -> Result<Self> {
        let host = resolve_host(config.host.as_deref(), std::env::var(HOST_ENV).ok().as_deref())?;
        let token = access_token()?;
        let http = HttpClient::new(&host, &token)
            .with_context(|| format!("Failed to create client for {host}"))?;

        let retry = retry_config(config.retry.as_ref());
        log::info!(
            "Connecting to {host} (max_attempts={}, missing_on_read={:?})",
            retry.max_attempts,
            config.missing_on_read
        );

        let client: SharedClient = if retry.retries() {
            Arc::new(RetryingClient::new(http, retry))
        } else {
            Arc::new(http)
        };

        Ok(Self {
            host,
            client,
            missing_on_read: config.missing_on_read,
        })
    }
}

/// Application base URL from the declaration file, falling back to the
/// environment. A bare host name gets `https://`.
pub fn resolve_host(configured: Option<&str>, env: Option<&str>) -> Result<String, ProviderError> {
    let host = [configured, env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|h| !h.is_empty())
        .ok_or(ProviderError::MissingHost)?;
    iotcentral_client::base_url(host).map_err(ProviderError::InvalidHost)
}

/// Retry policy for the client; without a `[provider.retry]` table every
/// call is made exactly once.
pub fn retry_config(settings: Option<&RetrySettings>) -> RetryConfig {
    match settings {
        None => RetryConfig::no_retry(),
        Some(s) => RetryConfig {
            max_attempts: s.max_attempts.max(1),
            base_delay: Duration::from_millis(s.base_delay_ms),
            backoff_factor: s.backoff_factor,
            max_delay: Duration::from_millis(s.max_delay_ms),
        },
    }
}

fn access_token() -> Result<String, ProviderError> {
    if let Ok(token) = std::env::var(TOKEN_ENV)
        && !token.trim().is_empty()
    {
        log::debug!("Using access token from {TOKEN_ENV}");
        return Ok(token.trim().to_string());
    }
    azure_cli_token()
}

/// Ask the Azure CLI for a token for the logged-in identity
fn azure_cli_token() -> Result<String, ProviderError> {
    log::debug!("Requesting access token for {TOKEN_SCOPE} from the Azure CLI");
    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            TOKEN_RESOURCE,
            "--query",
            "accessToken",
            "--output",
            "tsv",
        ])
        .output()
        .map_err(|e| ProviderError::Token(format!("could not run az: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::Token(stderr.trim().to_string()));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ProviderError::Token("az returned an empty token".to_string()));
    }
    Ok(token)
}
