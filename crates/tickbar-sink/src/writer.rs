//! NDJSON lines on an async writer.

use async_trait::async_trait;
use tickbar_aggregate::OhlcvSummary;
use tickbar_types::SinkError;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::{Sink, SummaryPayload};

/// Writes one NDJSON line per summary to an async writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    name: String,
    writer: Mutex<W>,
}

impl WriterSink<Stdout> {
    /// Creates a sink writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new("stdout", tokio::io::stdout())
    }
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a named sink over `writer`.
    #[must_use]
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Sink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, summary: &OhlcvSummary) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&SummaryPayload::from(summary))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}
