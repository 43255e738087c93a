//! Fake session backend
//!
//! Every launch creates an in-memory channel pair and hands the session end
//! to the test, which then plays the part of the interpreter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pycalc::backend::{SessionBackend, SessionControl, SessionHandle};
use pycalc::channel::channel_pair;
use pycalc::error::Result;
use pycalc::models::{OutputEvent, SessionInfo, StreamKind};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Session end of one fake launch
pub struct FakeSession {
    pub id: String,
    pub payloads: UnboundedReceiver<String>,
    pub events: UnboundedSender<OutputEvent>,
    pub terminated: Arc<AtomicBool>,
}

impl FakeSession {
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn emit_stdout(&self, text: &str) {
        let _ = self
            .events
            .send(OutputEvent::stream(StreamKind::Stdout, vec![text.to_string()]));
    }

    pub fn emit_stderr(&self, text: &str) {
        let _ = self
            .events
            .send(OutputEvent::stream(StreamKind::Stderr, vec![text.to_string()]));
    }

    pub fn emit_heartbeat(&self) {
        let _ = self.events.send(OutputEvent::heartbeat_at(chrono::Utc::now()));
    }

    /// Payloads received so far
    pub fn drain_payloads(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        while let Ok(payload) = self.payloads.try_recv() {
            payloads.push(payload);
        }
        payloads
    }
}

/// Shared record of every session the backend launched
pub type LaunchLog = Arc<Mutex<Vec<FakeSession>>>;

#[derive(Default)]
pub struct FakeBackend {
    launches: LaunchLog,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> LaunchLog {
        Arc::clone(&self.launches)
    }
}

struct FakeControl {
    terminated: Arc<AtomicBool>,
}

impl SessionControl for FakeControl {
    fn terminate(&mut self) -> Result<()> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        !self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    fn kind(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self) -> Result<SessionHandle> {
        let (channel, endpoint) = channel_pair();
        let info = SessionInfo::new("fake", None);
        let terminated = Arc::new(AtomicBool::new(false));

        self.launches.lock().unwrap().push(FakeSession {
            id: info.id.clone(),
            payloads: endpoint.payloads,
            events: endpoint.events,
            terminated: Arc::clone(&terminated),
        });

        Ok(SessionHandle::new(
            info,
            channel,
            Box::new(FakeControl { terminated }),
        ))
    }
}
