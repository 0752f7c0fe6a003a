//! Sink abstraction.

use async_trait::async_trait;
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::SinkError;

/// A downstream destination for window summaries.
///
/// Sinks must not depend on each other: the dispatcher may run them in any
/// order or concurrently, and a failed delivery is never retried.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs and dispatch reports.
    fn name(&self) -> &str;

    /// Checks that the sink can accept writes.
    ///
    /// Called once at startup; a failure aborts the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink's backing medium is unusable.
    async fn ready(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Delivers one summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or publish failed.
    async fn deliver(&self, summary: &OhlcvSummary) -> Result<(), SinkError>;
}
