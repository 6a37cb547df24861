//! Command implementations for the `rollup` binary

mod context;
mod event;
mod run;
mod schedule;
pub mod style;

pub use event::run_event;
pub use run::{RunOptions, run_cycle};
pub use schedule::show_schedule;

use anstream::{eprintln, println};
use async_trait::async_trait;
use sprint_rollup::error::Error;
use sprint_rollup::release::{ProgressCallback, ReleaseStep};
use style::{Stylize, arrow};

/// Prints cycle progress to the terminal
pub struct CliProgress {
    verbose: bool,
}

impl CliProgress {
    /// Steps only
    pub const fn compact() -> Self {
        Self { verbose: false }
    }

    /// Steps and every status line
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_step(&self, step: &ReleaseStep) {
        println!("{} {}", arrow(), step.emphasis());
    }

    async fn on_message(&self, message: &str) {
        if self.verbose {
            println!("  {}", message.muted());
        } else {
            println!("  {message}");
        }
    }

    async fn on_error(&self, error: &Error) {
        eprintln!("  {} {error}", "failed:".error());
    }
}
