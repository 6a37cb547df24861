//! Progress reporting for release cycles

use crate::error::Error;
use crate::release::plan::ReleaseStep;
use async_trait::async_trait;

/// Receives progress while a cycle runs
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A plan step is about to run
    async fn on_step(&self, step: &ReleaseStep);

    /// Free-form status line
    async fn on_message(&self, message: &str);

    /// A step failed; the cycle is about to abort
    async fn on_error(&self, error: &Error);
}

/// Discards all progress
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_step(&self, _step: &ReleaseStep) {}
    async fn on_message(&self, _message: &str) {}
    async fn on_error(&self, _error: &Error) {}
}
