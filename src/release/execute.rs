//! Release execution - effectful operations
//!
//! Takes a [`ReleasePlan`] and performs its steps against the forge in order.
//! The first failing step aborts the rest; nothing already written is undone.
//! Every step re-reads the state it depends on right before writing.

use crate::changelog::{EntryBody, compose_entry, has_section, latest_release_tag, prepend};
use crate::config::{ChangelogMode, Settings, TagPolicy};
use crate::error::{Error, Result};
use crate::platform::ForgeService;
use crate::release::plan::{ReleasePlan, ReleaseStep, merge_title};
use crate::release::progress::ProgressCallback;
use crate::release::requests::{RequestOutcome, ensure_request, reconcile_request};
use crate::types::{FileUpdate, RefCreation};
use crate::version::{Version, read_version, set_version};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Result of plan execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Branches that were created
    pub created_branches: Vec<String>,
    /// Branches that already existed
    pub existing_branches: Vec<String>,
    /// How the sprint branch reached mainline
    pub merge: Option<RequestOutcome>,
    /// Version now recorded on the bump branch
    pub version: Option<Version>,
    /// Whether a changelog section was written
    pub changelog_updated: bool,
    /// Tag created this cycle
    pub tag: Option<String>,
    /// Tag that already existed and was skipped
    pub skipped_tag: Option<String>,
    /// Request lifecycle outcome for the next sprint
    pub request: Option<RequestOutcome>,
}

/// Execute the release plan (EFFECTFUL)
pub async fn execute_plan(
    plan: &ReleasePlan,
    forge: &dyn ForgeService,
    settings: &Settings,
    today: NaiveDate,
    progress: &dyn ProgressCallback,
) -> Result<ExecutionResult> {
    let mut result = ExecutionResult::default();

    for step in &plan.steps {
        progress.on_step(step).await;
        if let Err(e) = run_step(step, plan, forge, settings, today, progress, &mut result).await {
            progress.on_error(&e).await;
            return Err(e);
        }
    }

    Ok(result)
}

async fn run_step(
    step: &ReleaseStep,
    plan: &ReleasePlan,
    forge: &dyn ForgeService,
    settings: &Settings,
    today: NaiveDate,
    progress: &dyn ProgressCallback,
    result: &mut ExecutionResult,
) -> Result<()> {
    let mainline = plan.mainline.as_str();

    match step {
        ReleaseStep::CreateBranch { name } => {
            // Mainline moves during a cycle; branch from its current head
            let sha = forge.branch_head(mainline).await?;
            match forge.create_branch(name, &sha).await? {
                RefCreation::Created => {
                    info!(branch = %name, %sha, "created branch");
                    progress.on_message(&format!("Created {name}")).await;
                    result.created_branches.push(name.clone());
                }
                RefCreation::AlreadyExists => {
                    info!(branch = %name, "branch already exists, skipping");
                    progress
                        .on_message(&format!("{name} already exists, skipping"))
                        .await;
                    result.existing_branches.push(name.clone());
                }
            }
        }

        ReleaseStep::MergeSprint { branch } => {
            let title = merge_title(branch, mainline);
            let outcome =
                match reconcile_request(forge, branch, mainline, settings.merge_method, &title)
                    .await?
                {
                    RequestOutcome::NotFound => merge_directly(forge, branch, mainline, &title).await?,
                    other => other,
                };
            progress.on_message(&outcome.to_string()).await;
            result.merge = Some(outcome);
        }

        ReleaseStep::BumpVersion { branch, from, to } => {
            if write_version(forge, settings, branch, *from, *to).await? {
                progress
                    .on_message(&format!("Bumped version to {to} on {branch}"))
                    .await;
            } else {
                progress
                    .on_message(&format!("{branch} already at {to}"))
                    .await;
            }
            result.version = Some(*to);
        }

        ReleaseStep::UpdateChangelog { branch, version } => {
            result.changelog_updated =
                write_changelog(forge, settings, branch, *version, today).await?;
            if result.changelog_updated {
                progress.on_message("Changelog updated").await;
            } else {
                progress
                    .on_message(&format!("Changelog already has {}", version.tag_name()))
                    .await;
            }
        }

        ReleaseStep::CreateTag { tag, .. } => {
            if create_tag(forge, settings.on_existing_tag, tag, mainline).await? {
                progress.on_message(&format!("Tagged {tag}")).await;
                result.tag = Some(tag.clone());
            } else {
                progress
                    .on_message(&format!("{tag} already exists, skipping"))
                    .await;
                result.skipped_tag = Some(tag.clone());
            }
        }

        ReleaseStep::OpenRequest { head, title, body } => {
            let outcome = ensure_request(forge, head, mainline, title, body).await?;
            progress.on_message(&outcome.to_string()).await;
            result.request = Some(outcome);
        }
    }

    Ok(())
}

async fn merge_directly(
    forge: &dyn ForgeService,
    branch: &str,
    mainline: &str,
    title: &str,
) -> Result<RequestOutcome> {
    info!(branch, mainline, "no open request, merging branch directly");
    let merged = forge.merge_branch(branch, mainline, title).await?;
    if !merged.merged {
        return Err(Error::MergeFailed {
            head: branch.to_string(),
            base: mainline.to_string(),
            reason: merged
                .message
                .unwrap_or_else(|| "merge was not performed".to_string()),
        });
    }
    Ok(RequestOutcome::MergedDirectly { sha: merged.sha })
}

/// Rewrite the marker on `branch` from `from` to `to`.
///
/// Returns `false` when the branch already carries `to`.
async fn write_version(
    forge: &dyn ForgeService,
    settings: &Settings,
    branch: &str,
    from: Version,
    to: Version,
) -> Result<bool> {
    let path = &settings.version_file;
    let file = forge
        .get_file(path, branch)
        .await?
        .ok_or_else(|| Error::FileNotFound {
            path: path.clone(),
            branch: branch.to_string(),
        })?;

    let found = read_version(&file.content, &settings.version_marker)?;
    if found == to {
        info!(branch, version = %to, "version already written");
        return Ok(false);
    }
    if found != from {
        return Err(Error::VersionDrift {
            branch: branch.to_string(),
            expected: from.to_string(),
            found: found.to_string(),
        });
    }

    let content = set_version(&file.content, &settings.version_marker, to)?;
    forge
        .put_file(&FileUpdate {
            path: path.clone(),
            branch: branch.to_string(),
            content,
            message: format!("Bump version to {to}"),
            token: Some(file.token),
        })
        .await?;
    info!(branch, %from, %to, "bumped version");
    Ok(true)
}

/// Prepend the section for `version` on `branch`.
///
/// Returns `false` when the changelog already has it.
async fn write_changelog(
    forge: &dyn ForgeService,
    settings: &Settings,
    branch: &str,
    version: Version,
    today: NaiveDate,
) -> Result<bool> {
    let path = &settings.changelog_path;
    let existing = forge.get_file(path, branch).await?;
    if existing
        .as_ref()
        .is_some_and(|f| has_section(&f.content, version))
    {
        info!(branch, %version, "changelog already has this release");
        return Ok(false);
    }

    let body = match settings.changelog {
        ChangelogMode::Placeholder => EntryBody::Placeholder,
        ChangelogMode::Commits => {
            let tags = forge.list_tags().await?;
            let last_tag = latest_release_tag(tags.as_slice());
            let subjects = match last_tag {
                Some(tag) => forge.commit_subjects(tag, branch).await?,
                None => Vec::new(),
            };
            EntryBody::from_history(last_tag, subjects)
        }
    };

    let section = compose_entry(version, today, &body);
    let (document, token) = match existing {
        Some(file) => (prepend(Some(&file.content), &section), Some(file.token)),
        None => {
            info!(path = %path, "changelog missing, creating it");
            (prepend(None, &section), None)
        }
    };

    forge
        .put_file(&FileUpdate {
            path: path.clone(),
            branch: branch.to_string(),
            content: document,
            message: format!("Update changelog for {}", version.tag_name()),
            token,
        })
        .await?;
    info!(branch, %version, "updated changelog");
    Ok(true)
}

/// Tag the current mainline head.
///
/// Returns `false` when the tag existed and the policy is to skip.
async fn create_tag(
    forge: &dyn ForgeService,
    policy: TagPolicy,
    tag: &str,
    mainline: &str,
) -> Result<bool> {
    let exists = |policy: TagPolicy| match policy {
        TagPolicy::Fail => Err(Error::TagAlreadyExists(tag.to_string())),
        TagPolicy::Skip => {
            warn!(tag, "tag already exists, skipping");
            Ok(false)
        }
    };

    if forge.list_tags().await?.iter().any(|t| t == tag) {
        return exists(policy);
    }

    let head = forge.branch_head(mainline).await?;
    match forge.create_tag(tag, &head, &format!("Release {tag}")).await {
        Ok(()) => {
            info!(tag, sha = %head, "created tag");
            Ok(true)
        }
        Err(Error::TagAlreadyExists(_)) => exists(policy),
        Err(e) => Err(e),
    }
}
