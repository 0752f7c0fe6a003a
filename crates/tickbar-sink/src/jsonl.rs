//! Append-only per-symbol JSONL files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::SinkError;
use tokio::io::AsyncWriteExt;

use crate::{Sink, SummaryPayload};

/// Appends one NDJSON line per summary to `<dir>/aggregated_data_<symbol>.jsonl`.
///
/// Files are opened in append mode for every write, so several processes can
/// share a directory and nothing is buffered across summaries.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    dir: PathBuf,
}

impl JsonlSink {
    /// File name prefix for per-symbol files.
    pub const FILE_PREFIX: &'static str = "aggregated_data_";

    /// Creates a sink writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a symbol's summaries are appended to.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced with `_` so a symbol
    /// such as `BTC/USD` cannot escape the output directory.
    #[must_use]
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        let safe: String = symbol
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}{safe}.jsonl", Self::FILE_PREFIX))
    }
}

#[async_trait]
impl Sink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn ready(&self) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn deliver(&self, summary: &OhlcvSummary) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&SummaryPayload::from(summary))?;
        line.push(b'\n');

        let path = self.path_for(&summary.symbol);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(symbol = %summary.symbol, path = %path.display(), "summary appended");
        Ok(())
    }
}
