//! Command implementations for the iotc CLI

pub mod apply;
pub mod data;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod state;

use anyhow::Result;
use declarative::Registry;
use std::path::PathBuf;

use crate::Context;
use crate::config::{self, Config};
use crate::provider::Provider;
use crate::resource;

/// Declaration file, its parsed contents, and the state file beside it
pub struct Project {
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub config: Config,
}

impl Project {
    /// Load the declaration file; commands that only need the provider
    /// block pass `require_config = false` and get an empty declaration
    /// set when the file is absent.
    pub fn load(ctx: &Context, require_config: bool) -> Result<Self> {
        let config_path = config::config_path(ctx.config.as_deref())?;
        let state_path = config::state_path(ctx.state.as_deref(), &config_path)?;

        let config = if config_path.exists() || require_config {
            Config::load(&config_path)?
        } else {
            log::debug!("No declaration file at {}", config_path.display());
            Config::default()
        };

        Ok(Self {
            config_path,
            state_path,
            config,
        })
    }

    /// Connect to the application and build the resource registry
    pub fn connect(&self) -> Result<(Provider, Registry)> {
        let provider = Provider::connect(&self.config.provider)?;
        let registry = resource::registry(&provider.client);
        Ok((provider, registry))
    }
}
