//! Event command - serverless-style entrypoint

use anyhow::Context;
use sprint_rollup::config::Settings;
use sprint_rollup::event::{EventPayload, EventResponse, handle_event};
use std::io::Read;
use std::path::Path;

/// Read a payload (file path, `-` for stdin, or none), run one cycle and
/// return the response
pub async fn run_event(config_path: Option<&Path>, payload: Option<&Path>) -> anyhow::Result<EventResponse> {
    let text = match payload {
        Some(path) if path == Path::new("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read payload from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?,
        None => String::new(),
    };
    let payload = EventPayload::from_json(&text).context("invalid event payload")?;
    let settings = Settings::load(config_path)?;
    let today = chrono::Local::now().date_naive();

    Ok(handle_event(&payload, |key| std::env::var(key).ok(), &settings, today).await)
}
