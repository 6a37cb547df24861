//! Forge service construction

use crate::config::ForgeConfig;
use crate::error::Result;
use crate::platform::{ForgeService, GitHubService, GitLabService};
use crate::types::Platform;
use tracing::debug;

/// Build the forge service for a resolved configuration
pub fn create_forge_service(config: &ForgeConfig) -> Result<Box<dyn ForgeService>> {
    debug!(
        platform = %config.repo.platform,
        project = %config.repo.project_path(),
        api_base = %config.api_base,
        "creating forge service"
    );
    match config.repo.platform {
        Platform::GitHub => Ok(Box::new(GitHubService::new(
            &config.token,
            &config.api_base,
            config.repo.owner.clone(),
            config.repo.repo.clone(),
            config.repo.host.clone(),
        )?)),
        Platform::GitLab => Ok(Box::new(GitLabService::new(
            config.token.clone(),
            &config.api_base,
            config.repo.clone(),
            config.project_id.as_deref(),
        )?)),
    }
}
