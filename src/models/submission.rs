//! Submission Model
//!
//! A submission is one unit of code sent into the session. On the wire it
//! is a single string: a one-character mode tag followed immediately by the
//! unmodified source text.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the session should evaluate a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// Single line pushed into the interactive accumulator
    Statement,
    /// Multi-line source that resets the accumulator and runs as one unit
    Block,
}

impl SubmissionMode {
    /// Leading wire tag for this mode
    pub fn tag(self) -> char {
        match self {
            SubmissionMode::Statement => '0',
            SubmissionMode::Block => '1',
        }
    }

    /// Parse a wire tag
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            '0' => Some(SubmissionMode::Statement),
            '1' => Some(SubmissionMode::Block),
            _ => None,
        }
    }
}

/// One unit of work for the interpreter session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub mode: SubmissionMode,
    pub source: String,
}

impl Submission {
    pub fn new(mode: SubmissionMode, source: impl Into<String>) -> Self {
        Self {
            mode,
            source: source.into(),
        }
    }

    /// Create a statement submission
    pub fn statement(source: impl Into<String>) -> Self {
        Self::new(SubmissionMode::Statement, source)
    }

    /// Create a block submission
    pub fn block(source: impl Into<String>) -> Self {
        Self::new(SubmissionMode::Block, source)
    }

    /// Encode as the tag-prefixed wire string
    pub fn encode(&self) -> String {
        let mut payload = String::with_capacity(self.source.len() + 1);
        payload.push(self.mode.tag());
        payload.push_str(&self.source);
        payload
    }

    /// Decode a tag-prefixed wire string
    pub fn decode(payload: &str) -> Result<Self> {
        let mut chars = payload.chars();
        let mode = chars
            .next()
            .and_then(SubmissionMode::from_tag)
            .ok_or_else(|| Error::InvalidSubmission {
                payload: payload.chars().take(32).collect(),
            })?;

        Ok(Self {
            mode,
            source: chars.as_str().to_string(),
        })
    }
}
