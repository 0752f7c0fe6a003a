//! Error types for tickbar.
//!
//! Each enum maps to one class of failure in the ingestion pipeline. Parse and
//! sink failures are recovered where they happen, transport failures are
//! retried, and only startup failures are fatal.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while turning a raw message into a [`crate::Tick`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Payload is not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Payload is valid JSON but not an object.
    #[error("Tick payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent or null.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// Timestamp is neither an ISO-8601 string nor a numeric epoch.
    #[error("Malformed timestamp: {value}")]
    MalformedTimestamp {
        /// The offending value as it appeared in the payload.
        value: String,
    },

    /// A field is present but violates the tick invariants.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Raised when a window with no ticks is summarized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot summarize an empty window for {symbol} at {minute_start}")]
pub struct EmptyWindowError {
    /// Symbol of the empty window.
    pub symbol: String,
    /// Minute the empty window was opened for.
    pub minute_start: DateTime<Utc>,
}

/// Errors from the inbound message transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection to the message channel was lost.
    #[error("Transport disconnected: {0}")]
    Disconnected(String),

    /// I/O error while reading from the transport.
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a single sink delivery.
#[derive(Error, Debug)]
pub enum SinkError {
    /// I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Summary could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backing service is not reachable.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Backing service refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Fatal errors raised while starting the pipeline.
#[derive(Error, Debug)]
pub enum StartupError {
    /// A sink failed its readiness probe.
    #[error("Sink '{sink}' is not ready: {source}")]
    Sink {
        /// Name of the sink.
        sink: String,
        /// The underlying sink error.
        source: SinkError,
    },

    /// The transport could not be opened.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
