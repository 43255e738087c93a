//! Session Backends
//!
//! A backend decides where an interpreter session lives and how it is torn
//! down. Launching yields a [`SessionHandle`]: the foreground end of the
//! execution channel plus a control object that can terminate the session
//! at any moment, whatever it is doing.

pub mod process;
pub mod thread;

use async_trait::async_trait;

use crate::channel::ExecutionChannel;
use crate::config::{BackendKind, SessionConfig};
use crate::error::Result;
use crate::models::SessionInfo;

pub use process::ProcessBackend;
pub use thread::ThreadBackend;

/// Creates interpreter sessions
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Backend name used in logs and session records
    fn kind(&self) -> &'static str;

    /// Start a new session
    ///
    /// # Errors
    /// Returns an error if the session could not be started (for example the
    /// worker executable is missing)
    async fn launch(&self) -> Result<SessionHandle>;
}

/// Termination hook of a running session
pub trait SessionControl: Send {
    /// Stop the session immediately. Work in progress is discarded.
    fn terminate(&mut self) -> Result<()>;

    /// Whether the session is still running, as far as can be told
    fn is_alive(&mut self) -> bool;
}

/// A launched session as seen by the supervisor
pub struct SessionHandle {
    pub info: SessionInfo,
    pub channel: ExecutionChannel,
    control: Box<dyn SessionControl>,
}

impl SessionHandle {
    pub fn new(
        info: SessionInfo,
        channel: ExecutionChannel,
        control: Box<dyn SessionControl>,
    ) -> Self {
        Self {
            info,
            channel,
            control,
        }
    }

    pub fn is_alive(&mut self) -> bool {
        self.control.is_alive()
    }

    /// Detach the channel and stop the session
    pub fn terminate(mut self) -> Result<()> {
        self.info.mark_terminating();
        self.channel.close();
        self.control.terminate()
    }
}

/// Build the backend selected in the configuration
pub fn from_config(config: &SessionConfig) -> Box<dyn SessionBackend> {
    match config.backend {
        BackendKind::Process => Box::new(ProcessBackend::new(config)),
        BackendKind::Thread => Box::new(ThreadBackend::new(config)),
    }
}
