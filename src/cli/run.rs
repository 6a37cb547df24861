//! Run command - execute one release cycle

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::println;
use chrono::NaiveDate;
use dialoguer::Confirm;
use indicatif::ProgressBar;
use sprint_rollup::error::{Error, Result};
use sprint_rollup::release::{
    CycleOptions, CycleReport, ExecutionResult, NoopProgress, ReleasePlan, RequestOutcome,
    run_release_cycle,
};
use sprint_rollup::types::PullRequest;
use std::path::Path;
use std::time::Duration;

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Dry run - show the plan without making changes
    pub dry_run: bool,
    /// Run even when the date is not a release day
    pub force: bool,
    /// Preview plan and prompt for confirmation before executing
    pub confirm: bool,
    /// Date to evaluate instead of today
    pub date: Option<NaiveDate>,
    /// Print every status line
    pub verbose: bool,
}

/// Run the release cycle command
pub async fn run_cycle(config_path: Option<&Path>, options: RunOptions) -> Result<()> {
    let ctx = CommandContext::new(config_path)?;
    let today = options
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let cycle_options = CycleOptions {
        dry_run: options.dry_run,
        force: options.force,
    };

    if options.dry_run || options.confirm {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("Reading {}...", ctx.project().emphasis()));
        spinner.enable_steady_tick(Duration::from_millis(80));

        let preview = run_release_cycle(
            ctx.forge.as_ref(),
            &ctx.settings,
            today,
            &NoopProgress,
            CycleOptions {
                dry_run: true,
                ..cycle_options
            },
        )
        .await;
        spinner.finish_and_clear();

        match preview? {
            CycleReport::NotReleaseDay { next } => {
                report_not_release_day(today, next);
                return Ok(());
            }
            CycleReport::DryRun { pending, plan } => {
                report_plan(pending.as_ref(), &plan);
                if options.dry_run {
                    println!("{}", "Run without --dry-run to execute.".muted());
                    return Ok(());
                }
            }
            CycleReport::Completed { .. } => {
                return Err(Error::Internal("dry run performed writes".to_string()));
            }
        }

        if !Confirm::new()
            .with_prompt("Proceed with release?")
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(());
        }
        println!();
    }

    println!(
        "{} {}",
        "Releasing".emphasis(),
        ctx.project().accent()
    );
    let progress = if options.verbose {
        CliProgress::verbose()
    } else {
        CliProgress::compact()
    };
    let report = run_release_cycle(
        ctx.forge.as_ref(),
        &ctx.settings,
        today,
        &progress,
        cycle_options,
    )
    .await?;

    match report {
        CycleReport::NotReleaseDay { next } => report_not_release_day(today, next),
        CycleReport::Completed { plan, result, .. } => print_summary(&plan, &result),
        CycleReport::DryRun { pending, plan } => report_plan(pending.as_ref(), &plan),
    }
    Ok(())
}

fn report_not_release_day(today: NaiveDate, next: Option<NaiveDate>) {
    println!(
        "{}",
        format!("{today} is not a biweekly release day. Skipping.").muted()
    );
    if let Some(next) = next {
        println!("{}", format!("Next cycle starts {next}.").muted());
    }
}

/// Report what would run (dry run)
fn report_plan(pending: Option<&PullRequest>, plan: &ReleasePlan) {
    println!("{}:", "Release plan".emphasis());
    println!();

    if let Some(pr) = pending {
        println!(
            "  {} #{} from {}",
            "Would settle".accent(),
            pr.number,
            pr.head_ref.accent()
        );
    }
    println!("  State: {}", plan.state.to_string().muted());
    for step in &plan.steps {
        println!("  {} {step}", "Would".success());
    }
    println!();
}

fn print_summary(plan: &ReleasePlan, result: &ExecutionResult) {
    println!();
    if plan.is_release() {
        println!("{} Release complete!", check());
    } else {
        println!("{} Cycle complete ({})", check(), plan.state);
    }

    if let Some(version) = result.version {
        println!("   Version: {}", version.to_string().accent());
    }
    if let Some(tag) = &result.tag {
        println!("   Tag: {}", tag.accent());
    }
    if let Some(tag) = &result.skipped_tag {
        println!("   {} {tag} already existed", "Tag:".warn());
    }
    if !result.created_branches.is_empty() {
        println!("   Created: {}", result.created_branches.join(", ").accent());
    }
    match &result.request {
        Some(RequestOutcome::Created(pr) | RequestOutcome::AlreadyOpen(pr)) => {
            println!("   Request: {}", pr.html_url.accent());
        }
        Some(RequestOutcome::CreateFailed { reason }) => {
            println!("   {} {}", "Request not opened:".warn(), reason.muted());
        }
        _ => {}
    }
    if let Some(RequestOutcome::Closed { number, reason }) = &result.merge {
        println!("   {} #{number} closed: {}", "Merge failed:".warn(), reason.muted());
    }
}
