//! Terminal styling helpers
//!
//! Colors are always emitted; `anstream` strips them when stdout is not a
//! terminal or `NO_COLOR` is set.

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use std::fmt::Display;

/// Check mark glyph
pub const CHECK: &str = "✓";

/// Semantic styles for CLI output
pub trait Stylize {
    /// Secondary information
    fn muted(&self) -> String;
    /// Names the user should notice
    fn emphasis(&self) -> String;
    /// Branches, tags and versions
    fn accent(&self) -> String;
    /// Completed actions
    fn success(&self) -> String;
    /// Skipped or degraded actions
    fn warn(&self) -> String;
    /// Failures
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }

    fn error(&self) -> String {
        self.red().bold().to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Step arrow
pub fn arrow() -> String {
    "→".muted()
}

/// Spinner used while reading repository state
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
