//! Platform detection from remote URLs

use crate::error::{Error, Result};
use crate::types::{Platform, PlatformConfig};
use url::Url;

/// Detect the platform from a remote URL's host
pub fn detect_platform(url: &str) -> Option<Platform> {
    let host = split_remote(url)?.0.to_ascii_lowercase();
    if host.contains("github") {
        Some(Platform::GitHub)
    } else if host.contains("gitlab") {
        Some(Platform::GitLab)
    } else {
        None
    }
}

/// Parse a remote URL into owner/repo and platform.
///
/// `platform` overrides host-based detection for self-hosted forges whose
/// host name does not mention the platform.
pub fn parse_repo_info(url: &str, platform: Option<Platform>) -> Result<PlatformConfig> {
    let (host, path) = split_remote(url).ok_or(Error::NoSupportedRemotes)?;

    let platform = platform
        .or_else(|| detect_platform(url))
        .ok_or_else(|| Error::InvalidConfig(format!("unsupported forge host '{host}' in {url}")))?;

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.rsplit_once('/').ok_or(Error::NoSupportedRemotes)?;
    if owner.is_empty() || repo.is_empty() {
        return Err(Error::NoSupportedRemotes);
    }
    // GitHub has no nested namespaces
    if platform == Platform::GitHub && owner.contains('/') {
        return Err(Error::NoSupportedRemotes);
    }

    Ok(PlatformConfig {
        platform,
        owner: owner.to_string(),
        repo: repo.to_string(),
        host,
    })
}

/// Split a remote into `(host, path)`; handles `https://`, `ssh://` and
/// scp-style `git@host:path`
fn split_remote(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    if let Ok(parsed) = Url::parse(url)
        && let Some(host) = parsed.host_str()
    {
        return Some((host.to_string(), parsed.path().to_string()));
    }

    // scp-style: [user@]host:path
    let (authority, path) = url.split_once(':')?;
    if authority.contains('/') || path.starts_with("//") {
        return None;
    }
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), path.to_string()))
}
