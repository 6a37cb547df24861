//! Shared test helpers

#![allow(dead_code)]

mod mock_forge;

pub use mock_forge::{MergeCall, MockForge, MockRequest, MockTag, RequestState};

use chrono::NaiveDate;
use sprint_rollup::config::Settings;

/// Default tracked version file
pub const VERSION_FILE: &str = "demo_package/__init__.py";

/// Default changelog path
pub const CHANGELOG: &str = "CHANGELOG.md";

/// Parse a `YYYY-MM-DD` date
pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// A release day for the default epoch
pub fn release_day() -> NaiveDate {
    date("2025-07-17")
}

/// Contents of a version file carrying `version`
pub fn version_file(version: &str) -> String {
    format!("\"\"\"Demo package.\"\"\"\n\n__version__ = \"{version}\"\n__author__ = \"acme\"\n")
}

/// A repository whose mainline carries `version`, plus sprint branches
/// forked from mainline
pub fn repo_at(version: &str, sprint_branches: &[&str]) -> MockForge {
    let forge = MockForge::new("main");
    forge.seed_file("main", VERSION_FILE, &version_file(version));
    forge.seed_file("main", CHANGELOG, "# Changelog\n\n## v2.3.0 - 2025-07-03\n\n- Automated biweekly release\n");
    for branch in sprint_branches {
        forge.seed_branch(branch, "main");
    }
    forge.clear_calls();
    forge
}

/// Default settings
pub fn settings() -> Settings {
    Settings::default()
}
