//! Changelog section composition
//!
//! Sections are prepended newest-first below the document header. Existing
//! sections are carried over byte-for-byte.

use crate::version::Version;
use chrono::NaiveDate;

/// Header written when no changelog exists yet
pub const DEFAULT_HEADER: &str = "# Changelog\n";

/// Placeholder body line used by the forge-API flavor
pub const PLACEHOLDER_LINE: &str = "Automated biweekly release";

/// Body of one release section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// A fixed one-line placeholder
    Placeholder,
    /// No release tag exists yet
    InitialRelease,
    /// A release tag exists but nothing was committed since
    NoNewCommits,
    /// Commit subjects since the last release tag, oldest first
    Commits(Vec<String>),
}

impl EntryBody {
    /// Build a body from the commit history since `last_tag`
    pub fn from_history(last_tag: Option<&str>, subjects: Vec<String>) -> Self {
        match last_tag {
            None => Self::InitialRelease,
            Some(_) if subjects.is_empty() => Self::NoNewCommits,
            Some(_) => Self::Commits(subjects),
        }
    }

    fn lines(&self) -> Vec<String> {
        match self {
            Self::Placeholder => vec![PLACEHOLDER_LINE.to_string()],
            Self::InitialRelease => vec!["Initial release".to_string()],
            Self::NoNewCommits => vec!["No new commits".to_string()],
            Self::Commits(subjects) => subjects.clone(),
        }
    }
}

/// Render one release section
pub fn compose_entry(version: Version, date: NaiveDate, body: &EntryBody) -> String {
    let mut section = format!("## {} - {}\n\n", version.tag_name(), date.format("%Y-%m-%d"));
    for line in body.lines() {
        section.push_str("- ");
        section.push_str(line.trim());
        section.push('\n');
    }
    section
}

/// Insert `section` above every existing section.
///
/// A leading `# ` title line (and the blank lines after it) stays on top; an
/// absent document gets [`DEFAULT_HEADER`].
pub fn prepend(existing: Option<&str>, section: &str) -> String {
    let document = existing.unwrap_or(DEFAULT_HEADER);
    let (header, rest) = split_header(document);

    let mut out = String::with_capacity(document.len() + section.len() + 2);
    if !header.is_empty() {
        out.push_str(header);
        if !header.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(section);
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(rest);
    }
    out
}

/// Split off the title line plus any blank lines following it
fn split_header(document: &str) -> (&str, &str) {
    if !document.starts_with("# ") {
        return ("", document);
    }
    let title_end = document.find('\n').map_or(document.len(), |i| i + 1);
    let rest = &document[title_end..];
    let body_start = rest.len() - rest.trim_start_matches(['\n', '\r']).len();
    (&document[..title_end], &rest[body_start..])
}

/// Whether `document` already has a section for `version`
pub fn has_section(document: &str, version: Version) -> bool {
    let heading = format!("## {}", version.tag_name());
    document.lines().any(|line| {
        line.strip_prefix(heading.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    })
}

/// The most recent `vX.Y.Z` tag, compared by version
pub fn latest_release_tag<S: AsRef<str>>(tags: &[S]) -> Option<&str> {
    tags.iter()
        .map(AsRef::as_ref)
        .filter_map(|t| Version::from_tag(t).map(|v| (v, t)))
        .max_by_key(|(v, _)| *v)
        .map(|(_, t)| t)
}
