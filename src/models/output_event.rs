//! Output Event Model
//!
//! Everything the session sends back to the foreground is one of these
//! variants. The `type` field is the explicit discriminator on the wire;
//! payloads are decoded into this enum once, at the channel boundary.

use serde::{Deserialize, Serialize};

/// Interpreter output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Message from the session to the foreground
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    /// Flushed standard output
    Stdout {
        /// Ordered text chunks, concatenated before presentation
        chunks: Vec<String>,
    },
    /// Flushed standard error (usually a traceback)
    Stderr {
        /// Ordered text chunks, concatenated before presentation
        chunks: Vec<String>,
    },
    /// Idle liveness signal
    Heartbeat {
        /// Milliseconds since the Unix epoch when the heartbeat was sent
        timestamp: i64,
    },
    /// Payload that did not match any known shape
    Malformed {
        /// The raw payload as received
        raw: String,
    },
}

impl OutputEvent {
    /// Build a stream event from accumulated chunks
    pub fn stream(kind: StreamKind, chunks: Vec<String>) -> Self {
        match kind {
            StreamKind::Stdout => OutputEvent::Stdout { chunks },
            StreamKind::Stderr => OutputEvent::Stderr { chunks },
        }
    }

    /// Heartbeat stamped with the given instant
    pub fn heartbeat_at(at: chrono::DateTime<chrono::Utc>) -> Self {
        OutputEvent::Heartbeat {
            timestamp: at.timestamp_millis(),
        }
    }

    /// Concatenated text for stream events
    pub fn text(&self) -> Option<String> {
        match self {
            OutputEvent::Stdout { chunks } | OutputEvent::Stderr { chunks } => {
                Some(chunks.concat())
            }
            _ => None,
        }
    }

    /// Stream this event belongs to, if any
    pub fn stream_kind(&self) -> Option<StreamKind> {
        match self {
            OutputEvent::Stdout { .. } => Some(StreamKind::Stdout),
            OutputEvent::Stderr { .. } => Some(StreamKind::Stderr),
            _ => None,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, OutputEvent::Heartbeat { .. })
    }
}
