use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::StateUpdate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Current state file format
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Canonical state of every managed entity, keyed by address
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct State {
    pub version: u32,

    /// Last time the state was written
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub resources: BTreeMap<String, StateEntry>,
}

/// Last canonical attributes read for one address
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateEntry {
    pub resource_type: String,
    pub attributes: Value,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// State Implementation
// ============================================================================

impl State {
    /// Load state from disk, or return an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, this iotc understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} entries from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, replacing the previous file atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(&self).context("Failed to serialize state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&StateEntry> {
        self.resources.get(address)
    }

    /// Attributes stored for an address
    pub fn attributes(&self, address: &str) -> Option<&Value> {
        self.get(address).map(|e| &e.attributes)
    }

    pub fn set(&mut self, address: &str, resource_type: &str, attributes: Value) {
        self.resources.insert(
            address.to_string(),
            StateEntry {
                resource_type: resource_type.to_string(),
                attributes,
            },
        );
    }

    pub fn remove(&mut self, address: &str) -> Option<StateEntry> {
        self.resources.remove(address)
    }

    /// Record what a reconciliation did to an address
    pub fn apply_update(&mut self, address: &str, resource_type: &str, update: StateUpdate) {
        match update {
            StateUpdate::Unchanged => {}
            StateUpdate::Set(attributes) => self.set(address, resource_type, attributes),
            StateUpdate::Remove => {
                self.remove(address);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Entries in address order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateEntry)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ============================================================================
// Tests
// ============================================================================
