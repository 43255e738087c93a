//! Configuration management for pycalc
//!
//! Settings for the background session, the liveness watchdog and the
//! editor integration. Files are loaded by [`loader::ConfigLoader`]; every
//! section falls back to its defaults field by field, so a config file only
//! needs to name what it changes.

pub mod loader;
pub mod state;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for pycalc
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Background session configuration
    pub session: SessionConfig,

    /// Liveness watchdog configuration
    pub watchdog: WatchdogConfig,

    /// Editor integration configuration
    pub editor: EditorConfig,
}

/// Where the interpreter session runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Child process running `pycalc worker`; termination is a kill
    #[default]
    Process,
    /// Thread inside the editor process; termination is cooperative
    Thread,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Process => "process",
            BackendKind::Thread => "thread",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "process" => Ok(BackendKind::Process),
            "thread" => Ok(BackendKind::Thread),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Interpreter session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session backend
    pub backend: BackendKind,

    /// Idle time after which the session announces it is alive
    pub heartbeat_interval_ms: u64,

    /// Sleep between input polls while idle
    pub poll_interval_ms: u64,

    /// Worker executable; defaults to the running binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_program: Option<PathBuf>,

    /// Whether the interpreter echoes statements (the echo is suppressed)
    pub echo_input: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Process,
            heartbeat_interval_ms: 3000,
            poll_interval_ms: 10,
            worker_program: None,
            echo_input: true,
        }
    }
}

/// Liveness watchdog configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Seconds of silence before the user is asked to terminate
    pub threshold_secs: u64,

    /// Confirmation text shown to the user
    pub prompt_message: String,
}

impl WatchdogConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            threshold_secs: 30,
            prompt_message:
                "The Python code has been running for a long time. Do you want to terminate it?"
                    .to_string(),
        }
    }
}

/// Editor integration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Key that submits the previous line
    pub trigger_key: String,

    /// Prefix of error notices
    pub notice_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            trigger_key: "Enter".to_string(),
            notice_prefix: "❌ ".to_string(),
        }
    }
}
