//! Session Lifecycle Model
//!
//! Supervisor-side record of the one live session. The session itself is
//! opaque to the foreground; this only tracks identity and lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of the supervisor's session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// No session exists
    #[default]
    Absent,
    /// A session is running and accepting submissions
    Live,
    /// The session is being torn down
    Terminating,
}

/// Identity and lifecycle of a background session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session identifier
    pub id: String,

    /// Backend that hosts the session ("process" or "thread")
    pub backend: String,

    /// Worker process id, when hosted in a child process
    pub pid: Option<u32>,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Current lifecycle state
    pub state: SessionState,

    /// Submissions sent to this session
    pub submissions_sent: u64,

    /// Output events received from this session
    pub events_received: u64,
}

impl SessionInfo {
    /// Create a record for a freshly spawned session
    pub fn new(backend: impl Into<String>, pid: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            backend: backend.into(),
            pid,
            started_at: Utc::now(),
            state: SessionState::Live,
            submissions_sent: 0,
            events_received: 0,
        }
    }

    pub fn mark_terminating(&mut self) {
        self.state = SessionState::Terminating;
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, SessionState::Live)
    }

    /// Get session uptime
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}
