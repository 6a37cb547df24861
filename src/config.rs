//! Release settings and forge credentials
//!
//! Two layers, validated once at startup:
//! - [`Settings`]: release policy, loaded from a TOML file or defaulted
//! - [`ForgeConfig`]: repository identity and credentials, read through a
//!   lookup function (the process environment in production)

use crate::error::{Error, Result};
use crate::platform::parse_repo_info;
use crate::sprint::SprintNaming;
use crate::types::{MergeMethod, Platform, PlatformConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory
pub const LOCAL_SETTINGS_FILE: &str = "rollup.toml";

/// Directory name under the user config dir
const APP_DIR: &str = "sprint-rollup";

/// Environment key for the remote URL
pub const ENV_REMOTE_URL: &str = "GIT_REMOTE_URL";
/// Environment key for the API base URL
pub const ENV_API_BASE: &str = "API_BASE";
/// Environment key for the forge token
pub const ENV_TOKEN: &str = "FORGE_TOKEN";
/// Environment key overriding `owner/repo`
pub const ENV_PROJECT_PATH: &str = "PROJECT_PATH";
/// Environment key for a numeric GitLab project id
pub const ENV_PROJECT_ID: &str = "PROJECT_ID";
/// Environment key overriding platform detection
pub const ENV_PLATFORM: &str = "FORGE_PLATFORM";

/// Where the version bump is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BumpTarget {
    /// Commit bump and changelog to mainline after the merge
    #[default]
    Mainline,
    /// Commit bump and changelog to the next sprint branch
    NextBranch,
}

/// How changelog section bodies are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangelogMode {
    /// One fixed placeholder line
    #[default]
    Placeholder,
    /// Commit subjects since the last release tag
    Commits,
}

/// What to do when the release tag already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagPolicy {
    /// Abort the cycle with `TagAlreadyExists`
    #[default]
    Fail,
    /// Log and continue
    Skip,
}

/// Release policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Long-lived branch receiving releases
    pub mainline: String,
    /// Sprint branch name prefix
    pub sprint_prefix: String,
    /// Sprint branch name suffix
    pub sprint_suffix: String,
    /// Path of the file carrying the version marker
    pub version_file: String,
    /// Name of the version variable
    pub version_marker: String,
    /// Path of the changelog document
    pub changelog_path: String,
    /// First release day; cycles repeat every 14 days from here
    pub epoch: NaiveDate,
    /// Branch receiving the bump commit
    pub bump_target: BumpTarget,
    /// Changelog body source
    pub changelog: ChangelogMode,
    /// Method used to merge sprint requests
    pub merge_method: MergeMethod,
    /// Existing-tag handling
    pub on_existing_tag: TagPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mainline: "main".to_string(),
            sprint_prefix: "s".to_string(),
            sprint_suffix: "test".to_string(),
            version_file: "demo_package/__init__.py".to_string(),
            version_marker: "__version__".to_string(),
            changelog_path: "CHANGELOG.md".to_string(),
            epoch: NaiveDate::from_ymd_opt(2025, 7, 3).unwrap_or_default(),
            bump_target: BumpTarget::default(),
            changelog: ChangelogMode::default(),
            merge_method: MergeMethod::default(),
            on_existing_tag: TagPolicy::default(),
        }
    }
}

impl Settings {
    /// Sprint branch naming scheme
    pub fn naming(&self) -> SprintNaming {
        SprintNaming::new(&self.sprint_prefix, &self.sprint_suffix)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&content)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Load settings from `explicit`, else the first existing default
    /// location, else built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_settings_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.mainline.trim().is_empty() {
            problems.push("mainline must not be empty");
        }
        if self.sprint_prefix.is_empty() && self.sprint_suffix.is_empty() {
            problems.push("sprint-prefix and sprint-suffix cannot both be empty");
        }
        if self.sprint_prefix.ends_with(|c: char| c.is_ascii_digit()) {
            problems.push("sprint-prefix must not end in a digit");
        }
        if self.sprint_suffix.starts_with(|c: char| c.is_ascii_digit()) {
            problems.push("sprint-suffix must not start with a digit");
        }
        if self.version_marker.trim().is_empty() {
            problems.push("version-marker must not be empty");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems.join("; ")))
        }
    }
}

/// Candidate settings locations in lookup order
pub fn default_settings_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_SETTINGS_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join("config.toml"));
    }
    paths
}

/// Repository identity and credentials
#[derive(Clone, PartialEq, Eq)]
pub struct ForgeConfig {
    /// Platform, owner and repo
    pub repo: PlatformConfig,
    /// API base URL, without trailing slash
    pub api_base: String,
    /// Access token
    pub token: String,
    /// Numeric GitLab project id, when known
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ForgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeConfig")
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Explicit values that take precedence over the lookup (event payloads)
#[derive(Debug, Clone, Default)]
pub struct ForgeOverrides {
    /// Remote URL
    pub remote_url: Option<String>,
    /// API base URL
    pub api_base: Option<String>,
    /// `owner/repo` path
    pub project_path: Option<String>,
    /// Numeric project id
    pub project_id: Option<String>,
}

impl ForgeConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::resolve(&ForgeOverrides::default(), lookup)
    }

    /// Build from explicit overrides, falling back to `lookup` per key.
    ///
    /// Every missing required key is reported in a single
    /// [`Error::Configuration`].
    pub fn resolve<F>(overrides: &ForgeOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |explicit: &Option<String>, key: &str| {
            explicit
                .clone()
                .or_else(|| lookup(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let remote_url = get(&overrides.remote_url, ENV_REMOTE_URL);
        let api_base = get(&overrides.api_base, ENV_API_BASE);
        let project_path = get(&overrides.project_path, ENV_PROJECT_PATH);
        let project_id = get(&overrides.project_id, ENV_PROJECT_ID);
        let platform_override = get(&None, ENV_PLATFORM)
            .map(|p| p.parse::<Platform>().map_err(Error::InvalidConfig))
            .transpose()?;

        let (repo, remote_problem) = match remote_url
            .as_deref()
            .map(|url| parse_repo_info(url, platform_override))
        {
            Some(Ok(repo)) => (Some(repo), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };

        let token = get(&None, ENV_TOKEN).or_else(|| {
            let fallbacks: &[&str] = match repo.as_ref().map(|r| r.platform) {
                Some(Platform::GitHub) => &["GITHUB_TOKEN", "GH_TOKEN"],
                Some(Platform::GitLab) => &["GITLAB_TOKEN"],
                None => &[],
            };
            fallbacks.iter().find_map(|key| get(&None, *key))
        });

        let mut missing = Vec::new();
        if remote_url.is_none() {
            missing.push(ENV_REMOTE_URL.to_string());
        }
        if api_base.is_none() {
            missing.push(ENV_API_BASE.to_string());
        }
        if token.is_none() {
            missing.push(ENV_TOKEN.to_string());
        }

        if let Some(problem) = remote_problem {
            if missing.is_empty() {
                return Err(problem);
            }
            missing.insert(0, format!("{ENV_REMOTE_URL} ({problem})"));
        }

        let (Some(mut repo), Some(api_base), Some(token)) = (repo, api_base, token) else {
            return Err(Error::Configuration(missing));
        };

        if let Some(path) = project_path {
            let (owner, name) = path
                .trim_matches('/')
                .rsplit_once('/')
                .ok_or_else(|| Error::InvalidConfig(format!("project path '{path}' is not owner/repo")))?;
            repo.owner = owner.to_string();
            repo.repo = name.to_string();
        }

        Ok(Self {
            repo,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            project_id,
        })
    }
}
