//! rollup - biweekly sprint releases for GitHub and GitLab

mod cli;

use anstream::{eprintln, println};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use cli::style::Stylize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rollup")]
#[command(about = "Biweekly sprint releases for GitHub and GitLab")]
#[command(version)]
struct Cli {
    /// Settings file (default: ./rollup.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one release cycle
    Run {
        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,

        /// Run even if today is not a release day
        #[arg(long)]
        force: bool,

        /// Evaluate the schedule for this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Preview the plan and prompt before executing
        #[arg(long)]
        confirm: bool,
    },

    /// Show whether a date is a release day and the next cycle starts
    Schedule {
        /// Date to check (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Number of upcoming cycle starts to list
        #[arg(long, default_value_t = 3)]
        upcoming: usize,
    },

    /// Handle a serverless-style event payload and print the JSON response
    Event {
        /// Payload file, or `-` for stdin
        #[arg(long)]
        payload: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            dry_run,
            force,
            date,
            confirm,
        } => {
            cli::run_cycle(
                config,
                cli::RunOptions {
                    dry_run,
                    force,
                    confirm,
                    date,
                    verbose: cli.verbose > 0,
                },
            )
            .await?;
        }
        Commands::Schedule { date, upcoming } => {
            cli::show_schedule(config, date, upcoming)?;
        }
        Commands::Event { payload } => {
            let response = cli::run_event(config, payload.as_deref()).await?;
            println!("{}", serde_json::to_string(&response)?);
            if !response.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".error());
            ExitCode::FAILURE
        }
    }
}
