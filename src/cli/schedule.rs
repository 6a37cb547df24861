//! Schedule command - show release days without touching the forge

use crate::cli::style::{Stylize, check};
use anstream::println;
use chrono::NaiveDate;
use sprint_rollup::config::Settings;
use sprint_rollup::error::Result;
use sprint_rollup::schedule::{is_release_day, upcoming_cycle_starts};
use std::path::Path;

/// Print whether `date` is a release day and the next `upcoming` cycle starts
pub fn show_schedule(config_path: Option<&Path>, date: Option<NaiveDate>, upcoming: usize) -> Result<()> {
    let settings = Settings::load(config_path)?;
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

    if is_release_day(date, settings.epoch) {
        println!("{} {} is a release day", check(), date.to_string().accent());
    } else {
        println!("{} is not a release day", date.to_string().accent());
    }

    let starts = upcoming_cycle_starts(date, settings.epoch, upcoming);
    if !starts.is_empty() {
        println!("{}", "Upcoming cycles:".emphasis());
        for start in starts {
            println!("  {start}");
        }
    }
    Ok(())
}
