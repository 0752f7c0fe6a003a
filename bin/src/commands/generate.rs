//! Generate command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;
use tickbar_lib::prelude::*;
use tickbar_lib::SyntheticTick;
use tokio::io::AsyncWriteExt;

/// Options for [`generate`].
pub(crate) struct GenerateOptions {
    pub(crate) symbol: String,
    pub(crate) base_price: f64,
    pub(crate) count: Option<u64>,
    pub(crate) multi_symbol: bool,
    pub(crate) seed: Option<u64>,
    pub(crate) interval_ms: u64,
}

impl GenerateOptions {
    fn feed(&self) -> SyntheticFeed {
        let seed = self.seed.unwrap_or_else(rand::random);
        let start = Utc::now();
        if self.multi_symbol {
            SyntheticFeed::multi_symbol(seed, start)
        } else {
            SyntheticFeed::new(seed, start).with_instrument(&self.symbol, self.base_price)
        }
    }
}

/// Write synthetic ticks to stdout, one JSON object per line.
pub(crate) async fn generate(options: GenerateOptions) -> Result<()> {
    let mut feed = options.feed();
    let interval = Duration::from_millis(options.interval_ms);
    let mut stdout = tokio::io::stdout();

    let mut written = 0u64;
    while options.count.is_none_or(|count| written < count) {
        let tick = if interval.is_zero() {
            feed.next()
        } else {
            feed.next_at(Utc::now())
        };
        let Some(tick) = tick else {
            break;
        };

        match write_tick(&mut stdout, &tick).await {
            Ok(()) => written += 1,
            // Downstream reader exited.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => break,
            Err(e) => return Err(e).context("Failed to write tick"),
        }

        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    tracing::debug!(ticks = written, "generation finished");
    Ok(())
}

async fn write_tick(stdout: &mut tokio::io::Stdout, tick: &SyntheticTick) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(tick)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await
}
