//! Inbound transports.

use async_trait::async_trait;
use std::io::BufRead;
use std::time::Duration;
use tickbar_types::TransportError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// A raw message as delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Channel (or topic) the message arrived on.
    pub channel: String,
    /// Undecoded payload bytes.
    pub payload: Vec<u8>,
}

impl RawMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(channel: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// Outcome of one [`TickSource::recv`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A message arrived.
    Message(RawMessage),
    /// Nothing arrived within the timeout.
    Idle,
    /// The source is finished and will never yield again.
    Exhausted,
}

/// A subscription that yields raw tick messages.
#[async_trait]
pub trait TickSource: Send {
    /// Waits up to `timeout` for the next message.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the connection was lost.
    async fn recv(&mut self, timeout: Duration) -> Result<Received, TransportError>;

    /// Re-establishes the subscription after a transport error.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the transport is still unreachable.
    async fn reconnect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Item carried by a [`ChannelSource`].
pub type ChannelItem = Result<RawMessage, TransportError>;

/// In-process source fed through a tokio channel.
///
/// Senders can inject [`TransportError`]s to exercise reconnect handling.
/// The source is exhausted once every sender has been dropped.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<ChannelItem>,
    reconnects: u32,
}

impl ChannelSource {
    /// Creates a bounded channel and the source reading from it.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<ChannelItem>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver))
    }

    /// Wraps an existing receiver.
    #[must_use]
    pub const fn new(receiver: mpsc::Receiver<ChannelItem>) -> Self {
        Self {
            receiver,
            reconnects: 0,
        }
    }

    /// Forwards lines from a blocking reader through a dedicated thread.
    ///
    /// Use this for stdin: the reader thread is detached, so a read that never
    /// returns cannot hold up runtime shutdown after the loop has drained.
    /// Blank lines are skipped; end of input exhausts the source and a read
    /// error is delivered once before the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the reader thread cannot be spawned.
    pub fn spawn_reader<R>(
        channel: impl Into<String>,
        reader: R,
        capacity: usize,
    ) -> Result<Self, TransportError>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, source) = Self::channel(capacity);
        let channel = channel.into();
        std::thread::Builder::new()
            .name(format!("tickbar-reader-{channel}"))
            .spawn(move || forward_lines(&channel, reader, &sender))?;
        Ok(source)
    }

    /// Number of reconnects performed so far.
    #[must_use]
    pub const fn reconnects(&self) -> u32 {
        self.reconnects
    }
}

#[async_trait]
impl TickSource for ChannelSource {
    async fn recv(&mut self, timeout: Duration) -> Result<Received, TransportError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Err(_) => Ok(Received::Idle),
            Ok(None) => Ok(Received::Exhausted),
            Ok(Some(item)) => item.map(Received::Message),
        }
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.reconnects += 1;
        Ok(())
    }
}

fn forward_lines<R: BufRead>(channel: &str, mut reader: R, sender: &mpsc::Sender<ChannelItem>) {
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        let item = match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => return,
            Ok(_) => {
                let line = buffer.trim_ascii();
                if line.is_empty() {
                    continue;
                }
                Ok(RawMessage::new(channel, line.to_vec()))
            }
            Err(e) => Err(TransportError::Io(e)),
        };
        let failed = item.is_err();
        // The receiving side is gone once the loop has stopped.
        if sender.blocking_send(item).is_err() || failed {
            return;
        }
    }
}

/// Newline-delimited source over any async reader (a file, a socket). For
/// stdin prefer [`ChannelSource::spawn_reader`].
///
/// Blank lines are skipped. End of input exhausts the source.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    channel: String,
    buffer: Vec<u8>,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Creates a source whose messages are tagged with `channel`.
    #[must_use]
    pub fn new(channel: impl Into<String>, reader: R) -> Self {
        Self {
            reader,
            channel: channel.into(),
            buffer: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            // Partial reads stay in `buffer` if this future is dropped.
            let read = self.reader.read_until(b'\n', &mut self.buffer).await?;
            if read == 0 && self.buffer.is_empty() {
                return Ok(None);
            }

            let line = std::mem::take(&mut self.buffer);
            let trimmed = line.trim_ascii();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_vec()));
            }
            if read == 0 {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl<R> TickSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn recv(&mut self, timeout: Duration) -> Result<Received, TransportError> {
        let channel = self.channel.clone();
        match tokio::time::timeout(timeout, self.next_line()).await {
            Err(_) => Ok(Received::Idle),
            Ok(Ok(Some(payload))) => Ok(Received::Message(RawMessage { channel, payload })),
            Ok(Ok(None)) => Ok(Received::Exhausted),
            Ok(Err(e)) => Err(e),
        }
    }
}
