//! Core data models for pycalc
//!
//! This module contains the data structures that travel between the
//! foreground supervisor and the background interpreter session:
//! submissions, output events, and the session lifecycle record.

pub mod output_event;
pub mod session_info;
pub mod submission;

// Re-exports for convenience
pub use output_event::{OutputEvent, StreamKind};
pub use session_info::{SessionInfo, SessionState};
pub use submission::{Submission, SubmissionMode};
