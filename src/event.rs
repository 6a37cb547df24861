//! Serverless-style invocation
//!
//! An event payload names the repository; credentials still come from the
//! environment lookup. The response mirrors what a function runtime expects:
//! `{"statusCode": ..., "body": ...}`.

use crate::config::{ForgeConfig, ForgeOverrides, Settings};
use crate::error::{Error, Result};
use crate::platform::create_forge_service;
use crate::release::{CycleOptions, CycleReport, NoopProgress, run_release_cycle};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Body returned after a completed cycle
pub const COMPLETED_BODY: &str = "Pipeline roll-up completed";

/// Project id as sent by callers: a number or a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectId {
    /// Numeric id
    Number(u64),
    /// Textual id or path
    Text(String),
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Invocation payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Remote URL of the repository
    #[serde(default)]
    pub repo_url: Option<String>,
    /// GitLab project id
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// `namespace/project` path
    #[serde(default)]
    pub project_path: Option<String>,
    /// Forge API base URL
    #[serde(default)]
    pub api_base: Option<String>,
}

impl EventPayload {
    /// Parse a payload from JSON text; empty input is an empty payload
    pub fn from_json(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Values that take precedence over the environment
    pub fn overrides(&self) -> ForgeOverrides {
        ForgeOverrides {
            remote_url: self.repo_url.clone(),
            api_base: self.api_base.clone(),
            project_path: self.project_path.clone(),
            project_id: self.project_id.as_ref().map(ToString::to_string),
        }
    }
}

/// Invocation response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// HTTP-style status
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Human-readable outcome
    pub body: String,
}

impl EventResponse {
    /// Whether the invocation succeeded
    pub const fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Handle one invocation end to end
pub async fn handle_event<F>(
    payload: &EventPayload,
    lookup: F,
    settings: &Settings,
    today: NaiveDate,
) -> EventResponse
where
    F: Fn(&str) -> Option<String>,
{
    let outcome = async {
        let config = ForgeConfig::resolve(&payload.overrides(), lookup)?;
        info!(project = %config.repo.project_path(), "handling event");
        let forge = create_forge_service(&config)?;
        run_release_cycle(
            forge.as_ref(),
            settings,
            today,
            &NoopProgress,
            CycleOptions::default(),
        )
        .await
    }
    .await;
    respond(outcome)
}

/// Map a cycle outcome to a response
pub fn respond(outcome: Result<CycleReport>) -> EventResponse {
    match outcome {
        Ok(CycleReport::NotReleaseDay { .. }) => EventResponse {
            status_code: 200,
            body: "Not a biweekly release day. Skipping.".to_string(),
        },
        Ok(_) => EventResponse {
            status_code: 200,
            body: COMPLETED_BODY.to_string(),
        },
        Err(e) => {
            error!(error = %e, "roll-up failed");
            EventResponse {
                status_code: status_for(&e),
                body: e.to_string(),
            }
        }
    }
}

const fn status_for(error: &Error) -> u16 {
    if error.is_configuration() { 400 } else { 500 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accepts_numeric_and_string_ids() {
        let numeric = EventPayload::from_json(r#"{"project_id": 42}"#).unwrap();
        assert_eq!(numeric.overrides().project_id.as_deref(), Some("42"));

        let text = EventPayload::from_json(r#"{"project_id": "42"}"#).unwrap();
        assert_eq!(text.overrides().project_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(EventPayload::from_json("  \n").unwrap(), EventPayload::default());
    }

    #[test]
    fn test_response_field_name() {
        let json = serde_json::to_value(EventResponse {
            status_code: 200,
            body: COMPLETED_BODY.to_string(),
        })
        .unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "Pipeline roll-up completed");
    }

    #[tokio::test]
    async fn test_missing_configuration_is_400() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 17).unwrap();
        let response =
            handle_event(&EventPayload::default(), |_| None, &Settings::default(), date).await;
        assert_eq!(response.status_code, 400);
        assert!(response.body.contains("GIT_REMOTE_URL"));
    }
}
