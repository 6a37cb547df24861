//! Release cycle engine
//!
//! Three-phase pattern:
//! 1. Gather - settle the in-flight request, read the marker and branch list
//! 2. Plan - create `ReleasePlan` (pure, testable)
//! 3. Execute - perform the writes (effectful)

mod execute;
mod plan;
mod progress;
mod requests;

pub use execute::{ExecutionResult, execute_plan};
pub use plan::{
    BOOTSTRAP_BODY, CycleSnapshot, ReleasePlan, ReleaseStep, bootstrap_request_title,
    create_release_plan, cycle_request_body, cycle_request_title, merge_title,
};
pub use progress::{NoopProgress, ProgressCallback};
pub use requests::{RequestOutcome, ensure_request, reconcile_request};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::platform::ForgeService;
use crate::schedule::{is_release_day, upcoming_cycle_starts};
use crate::types::PullRequest;
use crate::version::{Version, next_sprint_number, read_version};
use chrono::NaiveDate;
use tracing::info;

/// Options for a release cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOptions {
    /// Plan only; perform reads but no writes
    pub dry_run: bool,
    /// Run even when today is not a release day
    pub force: bool,
}

/// What a cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// The schedule gate was closed
    NotReleaseDay {
        /// Next release day, if representable
        next: Option<NaiveDate>,
    },
    /// Dry run: the plan that would run
    DryRun {
        /// Open request that would be settled first
        pending: Option<PullRequest>,
        /// Planned steps
        plan: ReleasePlan,
    },
    /// The plan ran to completion
    Completed {
        /// Outcome of settling the in-flight request
        settlement: RequestOutcome,
        /// Executed plan
        plan: ReleasePlan,
        /// Step results
        result: ExecutionResult,
    },
}

/// Read the mainline marker and the branch list
pub async fn gather_snapshot(forge: &dyn ForgeService, settings: &Settings) -> Result<CycleSnapshot> {
    let version = mainline_version(forge, settings).await?;
    let branches = forge.list_branches().await?;
    info!(%version, branches = branches.len(), "gathered repository state");
    Ok(CycleSnapshot { version, branches })
}

async fn mainline_version(forge: &dyn ForgeService, settings: &Settings) -> Result<Version> {
    let file = forge
        .get_file(&settings.version_file, &settings.mainline)
        .await?
        .ok_or_else(|| Error::FileNotFound {
            path: settings.version_file.clone(),
            branch: settings.mainline.clone(),
        })?;
    read_version(&file.content, &settings.version_marker)
}

/// Run one release cycle
///
/// The request left open by the previous cycle (`s{sprint+1}` into
/// mainline) is settled before the state is resolved, so the marker read for
/// planning reflects it.
pub async fn run_release_cycle(
    forge: &dyn ForgeService,
    settings: &Settings,
    today: NaiveDate,
    progress: &dyn ProgressCallback,
    options: CycleOptions,
) -> Result<CycleReport> {
    if !options.force && !is_release_day(today, settings.epoch) {
        let next = upcoming_cycle_starts(today, settings.epoch, 1).first().copied();
        info!(%today, ?next, "not a release day, skipping");
        return Ok(CycleReport::NotReleaseDay { next });
    }

    let naming = settings.naming();
    let mainline = settings.mainline.as_str();

    // Phase 1: gather
    let version = mainline_version(forge, settings).await?;
    let in_flight = naming.branch_for(next_sprint_number(version.sprint)?);
    progress
        .on_message(&format!("Mainline is at {version}"))
        .await;

    if options.dry_run {
        let pending = forge.find_open_request(&in_flight, mainline).await?;
        if let Some(pr) = &pending {
            progress
                .on_message(&format!("Would settle #{} from {in_flight}", pr.number))
                .await;
        }
        let snapshot = gather_snapshot(forge, settings).await?;
        let plan = create_release_plan(&snapshot, settings)?;
        info!(state = %plan.state, steps = plan.steps.len(), "planned release (dry run)");
        return Ok(CycleReport::DryRun { pending, plan });
    }

    let settlement = reconcile_request(
        forge,
        &in_flight,
        mainline,
        settings.merge_method,
        &merge_title(&in_flight, mainline),
    )
    .await?;
    if settlement != RequestOutcome::NotFound {
        progress
            .on_message(&format!("Settled {in_flight}: {settlement}"))
            .await;
    }

    let snapshot = gather_snapshot(forge, settings).await?;

    // Phase 2: plan
    let plan = create_release_plan(&snapshot, settings)?;
    info!(state = %plan.state, steps = plan.steps.len(), "planned release");
    progress.on_message(&format!("State: {}", plan.state)).await;

    // Phase 3: execute
    let result = execute_plan(&plan, forge, settings, today, progress).await?;

    Ok(CycleReport::Completed {
        settlement,
        plan,
        result,
    })
}
