//! Declaration file (`iotcentral.toml`)
//!
//! ```toml
//! [provider]
//! host = "myapp.azureiotcentral.com"
//! missing_on_read = "error"
//!
//! [provider.retry]
//! max_attempts = 3
//!
//! [organization.north]
//! id = "north"
//! display_name = "North"
//!
//! [device.thermostat]
//! id = "thermostat-1"
//! display_name = "Thermostat"
//! organizations = ["north"]
//! ```
//!
//! Every table below the provider is `<kind>.<name>`; the declaration's
//! address is `<resource_type>.<name>`.

use crate::resource::{KINDS, resource_type_for_table};
use anyhow::{Context, Result};
use declarative::MissingPolicy;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default declaration file name
pub const CONFIG_FILE: &str = "iotcentral.toml";

/// Default state file name
pub const STATE_FILE: &str = "iotcentral.state.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Application host; falls back to `IOTCENTRAL_HOST`
    #[serde(default)]
    pub host: Option<String>,
    /// What a refresh does with entities deleted outside of `iotc`
    #[serde(default)]
    pub missing_on_read: MissingPolicy,
    #[serde(default)]
    pub retry: Option<RetrySettings>,
}

/// `[provider.retry]`; absent means every remote call is made once
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetrySettings {
    /// Reject backoff settings that would shrink or poison the delay
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            anyhow::bail!(
                "Invalid [provider.retry] backoff_factor {}: expected a finite number of at least 1.0",
                self.backoff_factor
            );
        }
        Ok(())
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// One declared entity
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub address: String,
    pub resource_type: &'static str,
    pub attributes: Value,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    provider: ProviderConfig,
    #[serde(flatten)]
    tables: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Parsed declaration file
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub provider: ProviderConfig,
    /// Declarations in apply order of their kinds, by name within a kind
    pub declarations: Vec<Declaration>,
}

impl Config {
    /// Parse a declaration file's contents
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content).context("Invalid declaration file")?;

        for table in raw.tables.keys() {
            if resource_type_for_table(table).is_none() {
                let known: Vec<&str> = KINDS.iter().map(|(t, _)| *t).collect();
                anyhow::bail!(
                    "Unknown table [{table}] in declaration file (expected one of: provider, {})",
                    known.join(", ")
                );
            }
        }

        if let Some(retry) = &raw.provider.retry {
            retry.validate()?;
        }

        let mut declarations = Vec::new();
        for &(table, resource_type) in KINDS {
            let Some(entries) = raw.tables.get(table) else {
                continue;
            };
            for (name, attributes) in entries {
                declarations.push(Declaration {
                    address: format!("{resource_type}.{name}"),
                    resource_type,
                    attributes: attributes.clone(),
                });
            }
        }

        Ok(Self {
            provider: raw.provider,
            declarations,
        })
    }

    /// Load the declaration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        log::debug!(
            "Loaded {} declarations from {}",
            config.declarations.len(),
            path.display()
        );
        Ok(config)
    }

    /// Declaration at an address
    pub fn get(&self, address: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.address == address)
    }
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("Could not expand {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Declaration file to use: `--config`, else `./iotcentral.toml`, else the
/// user config directory's `iotcentral/iotcentral.toml`
pub fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return expand_path(path);
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }
    if let Some(dir) = dirs::config_dir() {
        let global = dir.join("iotcentral").join(CONFIG_FILE);
        if global.exists() {
            return Ok(global);
        }
    }
    Ok(local)
}

/// State file to use: `--state`, else next to the declaration file
pub fn state_path(explicit: Option<&str>, config_path: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => expand_path(path),
        None => Ok(config_path
            .parent()
            .map(|dir| dir.join(STATE_FILE))
            .unwrap_or_else(|| PathBuf::from(STATE_FILE))),
    }
}
