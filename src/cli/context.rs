//! Shared command context for CLI commands
//!
//! Loads settings and forge credentials once, validating both before any
//! command touches the network.

use sprint_rollup::config::{ForgeConfig, Settings};
use sprint_rollup::error::Result;
use sprint_rollup::platform::{ForgeService, create_forge_service};
use std::path::Path;

/// Shared context for commands that talk to the forge
pub struct CommandContext {
    /// Release policy
    pub settings: Settings,
    /// Resolved repository identity and credentials
    pub config: ForgeConfig,
    /// Forge service (GitHub/GitLab)
    pub forge: Box<dyn ForgeService>,
}

impl CommandContext {
    /// Load settings from `config_path` (or the default locations) and
    /// credentials from the environment
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let settings = Settings::load(config_path)?;
        let config = ForgeConfig::from_env()?;
        let forge = create_forge_service(&config)?;
        Ok(Self {
            settings,
            config,
            forge,
        })
    }

    /// `owner/repo` on the forge
    pub fn project(&self) -> String {
        self.config.repo.project_path()
    }
}
