//! Release planning - pure functions for creating release plans
//!
//! This module contains the pure, testable logic for deciding what a cycle
//! does. No I/O happens here - the snapshot is gathered beforehand.

use crate::config::{BumpTarget, Settings};
use crate::error::Result;
use crate::sprint::{SprintState, resolve_state};
use crate::version::Version;
use std::fmt;

/// Body of the bootstrap request
pub const BOOTSTRAP_BODY: &str = "Bootstrap PR for the first sprint cycle.";

/// Repository state gathered at the start of a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSnapshot {
    /// Version marker on mainline
    pub version: Version,
    /// Remote branch names
    pub branches: Vec<String>,
}

/// A single step in the release plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStep {
    /// Create a branch from the mainline head
    CreateBranch {
        /// Branch to create
        name: String,
    },
    /// Merge a sprint branch into mainline (open request first, else direct)
    MergeSprint {
        /// Sprint branch to merge
        branch: String,
    },
    /// Rewrite the version marker on a branch
    BumpVersion {
        /// Branch receiving the commit
        branch: String,
        /// Version the plan was built from
        from: Version,
        /// Version to write
        to: Version,
    },
    /// Prepend a changelog section on a branch
    UpdateChangelog {
        /// Branch receiving the commit
        branch: String,
        /// Version being released
        version: Version,
    },
    /// Tag the mainline head
    CreateTag {
        /// Tag name
        tag: String,
        /// Version being released
        version: Version,
    },
    /// Open a request into mainline unless one is already open
    OpenRequest {
        /// Source branch
        head: String,
        /// Request title
        title: String,
        /// Request body
        body: String,
    },
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateBranch { name } => write!(f, "create branch {name}"),
            Self::MergeSprint { branch } => write!(f, "merge {branch}"),
            Self::BumpVersion { branch, from, to } => {
                write!(f, "bump version {from} → {to} on {branch}")
            }
            Self::UpdateChangelog { branch, version } => {
                write!(f, "add changelog section for {} on {branch}", version.tag_name())
            }
            Self::CreateTag { tag, .. } => write!(f, "tag {tag}"),
            Self::OpenRequest { head, title, .. } => write!(f, "open request from {head}: {title}"),
        }
    }
}

/// Release plan - the functional core output
///
/// Created by [`create_release_plan`] (pure) and executed by
/// [`execute_plan`](super::execute_plan) (effectful).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    /// State the plan was derived from
    pub state: SprintState,
    /// Mainline branch
    pub mainline: String,
    /// Ordered steps
    pub steps: Vec<ReleaseStep>,
}

impl ReleasePlan {
    /// Version this plan releases or bootstraps, if any
    #[must_use]
    pub fn target_version(&self) -> Option<Version> {
        self.steps.iter().find_map(|s| match s {
            ReleaseStep::BumpVersion { to, .. } => Some(*to),
            _ => None,
        })
    }

    /// Whether the plan writes anything besides branches
    #[must_use]
    pub fn is_release(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, ReleaseStep::CreateTag { .. }))
    }
}

/// Title of the request for `sprint`
pub fn cycle_request_title(sprint: u64, branch: &str, mainline: &str) -> String {
    format!("Biweekly Sprint {sprint}: {branch} → {mainline}")
}

/// Body of the request for `sprint`
pub fn cycle_request_body(sprint: u64) -> String {
    format!("Automated PR for sprint {sprint}. This PR remains open for 2 weeks.")
}

/// Title of the bootstrap request
pub fn bootstrap_request_title(branch: &str, mainline: &str) -> String {
    format!("Initial Biweekly Sprint 1: {branch} → {mainline}")
}

/// Commit title used when merging a sprint into mainline
pub fn merge_title(branch: &str, mainline: &str) -> String {
    format!("Auto-merge {branch} → {mainline}")
}

/// Create a release plan (PURE - no I/O, easily testable)
///
/// Fails only when the marker's sprint counter cannot be advanced.
pub fn create_release_plan(snapshot: &CycleSnapshot, settings: &Settings) -> Result<ReleasePlan> {
    let naming = settings.naming();
    let mainline = settings.mainline.clone();
    let state = resolve_state(&naming, snapshot.version, &snapshot.branches)?;

    let steps = match &state {
        SprintState::NoSprintBranchesExist => {
            let first = naming.branch_for(1);
            vec![
                ReleaseStep::CreateBranch {
                    name: first.clone(),
                },
                ReleaseStep::BumpVersion {
                    branch: first.clone(),
                    from: snapshot.version,
                    to: snapshot.version.with_sprint(1),
                },
                ReleaseStep::OpenRequest {
                    title: bootstrap_request_title(&first, &mainline),
                    body: BOOTSTRAP_BODY.to_string(),
                    head: first,
                },
            ]
        }
        SprintState::CurrentSprintBranchMissing { next, .. } => {
            vec![ReleaseStep::CreateBranch { name: next.clone() }]
        }
        SprintState::CurrentSprintBranchPresent { current, next } => {
            let from = snapshot.version;
            let to = from.next_sprint()?;
            let merge = ReleaseStep::MergeSprint {
                branch: current.clone(),
            };
            let create_next = ReleaseStep::CreateBranch { name: next.clone() };
            let tag = ReleaseStep::CreateTag {
                tag: to.tag_name(),
                version: to,
            };
            let request = ReleaseStep::OpenRequest {
                head: next.clone(),
                title: cycle_request_title(to.sprint, next, &mainline),
                body: cycle_request_body(to.sprint),
            };

            match settings.bump_target {
                BumpTarget::Mainline => vec![
                    merge,
                    ReleaseStep::BumpVersion {
                        branch: mainline.clone(),
                        from,
                        to,
                    },
                    ReleaseStep::UpdateChangelog {
                        branch: mainline.clone(),
                        version: to,
                    },
                    tag,
                    create_next,
                    request,
                ],
                BumpTarget::NextBranch => vec![
                    merge,
                    create_next,
                    ReleaseStep::BumpVersion {
                        branch: next.clone(),
                        from,
                        to,
                    },
                    ReleaseStep::UpdateChangelog {
                        branch: next.clone(),
                        version: to,
                    },
                    tag,
                    request,
                ],
            }
        }
    };

    Ok(ReleasePlan {
        state,
        mainline,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(version: Version, branches: &[&str]) -> CycleSnapshot {
        CycleSnapshot {
            version,
            branches: branches.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            cycle_request_title(4, "s4test", "main"),
            "Biweekly Sprint 4: s4test → main"
        );
        assert_eq!(
            bootstrap_request_title("s1test", "main"),
            "Initial Biweekly Sprint 1: s1test → main"
        );
        assert_eq!(merge_title("s3test", "main"), "Auto-merge s3test → main");
    }

    #[test]
    fn test_missing_branch_plan_only_creates_next() {
        let plan = create_release_plan(
            &snapshot(Version::new(2, 3, 0), &["main", "s2test"]),
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(
            plan.steps,
            vec![ReleaseStep::CreateBranch {
                name: "s4test".to_string()
            }]
        );
        assert!(!plan.is_release());
        assert_eq!(plan.target_version(), None);
    }

    #[test]
    fn test_next_branch_plan_creates_branch_before_bump() {
        let settings = Settings {
            bump_target: BumpTarget::NextBranch,
            ..Settings::default()
        };
        let plan = create_release_plan(&snapshot(Version::new(2, 3, 0), &["main", "s3test"]), &settings)
            .unwrap();
        let names: Vec<String> = plan.steps.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "merge s3test",
                "create branch s4test",
                "bump version 2.3.0 → 2.4.0 on s4test",
                "add changelog section for v2.4.0 on s4test",
                "tag v2.4.0",
                "open request from s4test: Biweekly Sprint 4: s4test → main",
            ]
        );
    }

    #[test]
    fn test_exhausted_sprint_counter_fails_planning() {
        let version = Version::new(1, u64::MAX, 0);
        let branches = [format!("s{}test", u64::MAX)];
        let snapshot = CycleSnapshot {
            version,
            branches: branches.to_vec(),
        };
        assert!(create_release_plan(&snapshot, &Settings::default()).is_err());
    }
}
