//! Thread Backend
//!
//! Hosts the session on a thread inside the current process. A thread
//! cannot be killed, so termination detaches it and raises its cancel flag;
//! the bundled interpreter notices the flag inside loops and `sleep`.

use std::sync::Arc;
use std::thread;

use async_trait::async_trait;

use super::{SessionBackend, SessionControl, SessionHandle};
use crate::channel::channel_pair;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::interp::{CalcConsole, Interpreter};
use crate::models::SessionInfo;
use crate::session::{CancelFlag, InterpreterSession, SessionOptions};

const BACKEND: &str = "thread";

/// Builds a fresh interpreter for each session
pub type InterpreterFactory = Arc<dyn Fn() -> Box<dyn Interpreter> + Send + Sync>;

/// Runs each session on its own thread
#[derive(Clone)]
pub struct ThreadBackend {
    options: SessionOptions,
    factory: InterpreterFactory,
}

impl ThreadBackend {
    pub fn new(config: &SessionConfig) -> Self {
        let echo_input = config.echo_input;
        Self {
            options: SessionOptions::from(config),
            factory: Arc::new(move || -> Box<dyn Interpreter> {
                Box::new(CalcConsole::new(echo_input))
            }),
        }
    }

    /// Host a different interpreter
    pub fn with_interpreter<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Interpreter> + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl SessionBackend for ThreadBackend {
    fn kind(&self) -> &'static str {
        BACKEND
    }

    async fn launch(&self) -> Result<SessionHandle> {
        let (channel, endpoint) = channel_pair();
        let cancel = CancelFlag::new();

        let session = InterpreterSession::new(
            (self.factory)(),
            endpoint.payloads,
            endpoint.events,
            self.options.clone(),
        )
        .with_cancel_flag(cancel.clone());

        let info = SessionInfo::new(BACKEND, None);
        let join = thread::Builder::new()
            .name(format!("pycalc-session-{}", &info.id[..8]))
            .spawn(move || session.run())
            .map_err(|e| Error::SessionSpawnFailed {
                backend: BACKEND.to_string(),
                reason: e.to_string(),
            })?;

        info!("Started session thread (session {})", info.id);
        Ok(SessionHandle::new(
            info,
            channel,
            Box::new(ThreadControl { cancel, join }),
        ))
    }
}

struct ThreadControl {
    cancel: CancelFlag,
    join: thread::JoinHandle<()>,
}

impl SessionControl for ThreadControl {
    fn terminate(&mut self) -> Result<()> {
        self.cancel.cancel();
        if !self.join.is_finished() {
            debug!("Detaching session thread that is still running");
        }
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        !self.join.is_finished()
    }
}
