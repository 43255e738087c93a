//! Process Backend
//!
//! Runs the session in a child `pycalc worker` process. Submissions are
//! framed onto the child's stdin by a writer task; a reader task decodes
//! its stdout into output events. The child's stderr is inherited so worker
//! logs end up next to ours. Termination kills the child outright.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::{SessionBackend, SessionControl, SessionHandle};
use crate::channel::{codec, ExecutionChannel};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::models::{OutputEvent, SessionInfo};
use crate::session::worker;

const BACKEND: &str = "process";

/// Spawns a worker process per session
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    program: Option<PathBuf>,
    args: Vec<String>,
}

impl ProcessBackend {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            program: config.worker_program.clone(),
            args: worker::worker_args(config),
        }
    }

    /// Use a specific worker executable instead of the running binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    fn resolve_program(&self) -> Result<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => std::env::current_exe().map_err(|e| Error::SessionSpawnFailed {
                backend: BACKEND.to_string(),
                reason: format!("cannot locate current executable: {}", e),
            }),
        }
    }
}

#[async_trait]
impl SessionBackend for ProcessBackend {
    fn kind(&self) -> &'static str {
        BACKEND
    }

    async fn launch(&self) -> Result<SessionHandle> {
        let program = self.resolve_program()?;
        debug!("Spawning worker {} {:?}", program.display(), self.args);

        let mut child = Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::SessionSpawnFailed {
                backend: BACKEND.to_string(),
                reason: format!("{}: {}", program.display(), e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| Error::WorkerPipeUnavailable {
            pipe: "stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| Error::WorkerPipeUnavailable {
            pipe: "stdout".to_string(),
        })?;

        let (payload_tx, payload_rx) = unbounded_channel::<String>();
        let (event_tx, event_rx) = unbounded_channel::<OutputEvent>();

        let writer = tokio::spawn(write_payloads(stdin, payload_rx));
        let reader = tokio::spawn(read_events(stdout, event_tx));

        let info = SessionInfo::new(BACKEND, child.id());
        info!(
            "Started worker process (session {}, pid {:?})",
            info.id, info.pid
        );

        Ok(SessionHandle::new(
            info,
            ExecutionChannel::from_channels(payload_tx, event_rx),
            Box::new(ProcessControl {
                child,
                tasks: vec![writer, reader],
            }),
        ))
    }
}

/// Forward payloads to the worker's stdin until either side closes
async fn write_payloads(mut stdin: ChildStdin, mut payloads: UnboundedReceiver<String>) {
    while let Some(payload) = payloads.recv().await {
        let line = match codec::encode_payload_line(&payload) {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping unencodable payload: {}", e);
                continue;
            }
        };

        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        };
        if let Err(e) = written.await {
            debug!("Worker stdin closed: {}", e);
            break;
        }
    }
    debug!("Payload writer task exiting");
}

/// Decode worker stdout lines into events until EOF
async fn read_events(stdout: ChildStdout, events: UnboundedSender<OutputEvent>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if events.send(codec::decode_event_line(&line)).is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("Worker stdout reached EOF");
                break;
            }
            Err(e) => {
                warn!("Worker stdout read error: {}", e);
                break;
            }
        }
    }
}

struct ProcessControl {
    child: Child,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionControl for ProcessControl {
    fn terminate(&mut self) -> Result<()> {
        for task in &self.tasks {
            task.abort();
        }

        if let Ok(Some(status)) = self.child.try_wait() {
            debug!("Worker already exited with {}", status);
            return Ok(());
        }

        self.child
            .start_kill()
            .map_err(|e| Error::SessionTerminateFailed {
                session_id: self
                    .child
                    .id()
                    .map(|pid| format!("pid {}", pid))
                    .unwrap_or_else(|| "unknown".to_string()),
                reason: e.to_string(),
            })
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}
