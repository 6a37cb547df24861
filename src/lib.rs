//! sprint-rollup - biweekly sprint releases for GitHub and GitLab
//!
//! On every release day the cycle merges the current sprint branch into
//! mainline, bumps the `major.sprint.patch` marker, prepends a changelog
//! section, tags the release, creates the next sprint branch and opens its
//! pull/merge request. All repository access goes through the forge REST API.
//!
//! # Example
//!
//! ```no_run
//! use sprint_rollup::config::{ForgeConfig, Settings};
//! use sprint_rollup::platform::create_forge_service;
//! use sprint_rollup::release::{CycleOptions, NoopProgress, run_release_cycle};
//!
//! # async fn example() -> sprint_rollup::error::Result<()> {
//! let settings = Settings::load(None)?;
//! let forge = create_forge_service(&ForgeConfig::from_env()?)?;
//! let today = chrono::Local::now().date_naive();
//! run_release_cycle(forge.as_ref(), &settings, today, &NoopProgress, CycleOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod changelog;
pub mod config;
pub mod error;
pub mod event;
pub mod platform;
pub mod release;
pub mod schedule;
pub mod sprint;
pub mod types;
pub mod version;
