//! Version marker reading and rewriting
//!
//! The tracked file carries exactly one `<marker> = "<major>.<sprint>.<patch>"`
//! assignment. Rewrites touch only the quoted version text so every other byte
//! of the file survives unchanged.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `major.sprint.patch` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Major component, never changed by a release cycle
    pub major: u64,
    /// Sprint counter
    pub sprint: u64,
    /// Patch component, reset on every bump
    pub patch: u64,
}

impl Version {
    /// Create a version from its components
    pub const fn new(major: u64, sprint: u64, patch: u64) -> Self {
        Self {
            major,
            sprint,
            patch,
        }
    }

    /// The version for the following sprint (patch reset to 0)
    pub fn next_sprint(self) -> Result<Self> {
        Ok(Self::new(self.major, next_sprint_number(self.sprint)?, 0))
    }

    /// The same major version at an explicit sprint (patch reset to 0)
    pub const fn with_sprint(self, sprint: u64) -> Self {
        Self::new(self.major, sprint, 0)
    }

    /// Release tag name, e.g. `v2.4.0`
    pub fn tag_name(self) -> String {
        format!("v{self}")
    }

    /// Parse a release tag name (`v2.4.0`); other tags yield `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.strip_prefix('v')?.parse().ok()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.sprint, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidConfig(format!("'{s}' is not a major.sprint.patch version"));
        let mut parts = s.split('.');
        let mut next = || -> Result<u64> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// `sprint + 1`, or an error when the counter is exhausted
pub fn next_sprint_number(sprint: u64) -> Result<u64> {
    sprint
        .checked_add(1)
        .ok_or_else(|| Error::InvalidVersion(format!("sprint {sprint} cannot be advanced")))
}

/// Result of bumping the sprint component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bump {
    /// The new sprint number
    pub new_sprint: u64,
    /// The new version
    pub version: Version,
    /// Full file contents with the marker rewritten
    pub contents: String,
}

fn marker_pattern(marker: &str) -> Result<Regex> {
    // Horizontal whitespace only: a match must never span lines
    let pattern = format!(
        r#"{}[ \t]*=[ \t]*"(\d+)\.(\d+)\.(\d+)""#,
        regex::escape(marker)
    );
    Regex::new(&pattern)
        .map_err(|e| Error::InvalidConfig(format!("version marker '{marker}': {e}")))
}

/// Locate the first marker assignment; returns the version and the byte span
/// of the quoted version text (without quotes)
fn locate(contents: &str, marker: &str) -> Result<(Version, std::ops::Range<usize>)> {
    let missing = || Error::MissingVersionMarker(marker.to_string());
    let captures = marker_pattern(marker)?
        .captures(contents)
        .ok_or_else(missing)?;

    let component = |i: usize| -> Result<u64> {
        let text = captures.get(i).ok_or_else(missing)?.as_str();
        text.parse().map_err(|_| {
            Error::InvalidVersion(format!("`{marker}` component {text} does not fit in 64 bits"))
        })
    };
    let version = Version::new(component(1)?, component(2)?, component(3)?);

    let start = captures.get(1).ok_or_else(missing)?.start();
    let end = captures.get(3).ok_or_else(missing)?.end();
    Ok((version, start..end))
}

/// Read the version recorded by `marker` in `contents`
pub fn read_version(contents: &str, marker: &str) -> Result<Version> {
    locate(contents, marker).map(|(version, _)| version)
}

/// Rewrite the marker to `version`, keeping every other byte and ensuring a
/// trailing newline
pub fn set_version(contents: &str, marker: &str, version: Version) -> Result<String> {
    let (_, span) = locate(contents, marker)?;
    let mut rewritten = String::with_capacity(contents.len() + 4);
    rewritten.push_str(&contents[..span.start]);
    rewritten.push_str(&version.to_string());
    rewritten.push_str(&contents[span.end..]);
    if !rewritten.ends_with('\n') {
        rewritten.push('\n');
    }
    Ok(rewritten)
}

/// Increment the sprint component and reset patch to 0
pub fn bump(contents: &str, marker: &str) -> Result<Bump> {
    let version = read_version(contents, marker)?.next_sprint()?;
    let contents = set_version(contents, marker, version)?;
    Ok(Bump {
        new_sprint: version.sprint,
        version,
        contents,
    })
}
