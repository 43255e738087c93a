//! Polling input with liveness heartbeats
//!
//! The session never blocks waiting for input. Each poll either hands back
//! the next queued payload or, when the queue is empty, checks whether the
//! heartbeat interval has elapsed and announces that the session is alive.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc::{error::TryRecvError as AsyncTryRecvError, UnboundedReceiver};

use crate::channel::EventSink;
use crate::models::OutputEvent;

/// Result of one non-blocking poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Polled {
    /// The next submission payload
    Payload(String),
    /// Nothing queued right now
    Idle,
    /// The producer is gone and the queue is drained, or the event sink
    /// no longer accepts output
    Closed,
}

/// Unbounded FIFO of raw submission payloads
pub trait PayloadQueue: Send {
    fn poll_payload(&mut self) -> Polled;
}

impl PayloadQueue for UnboundedReceiver<String> {
    fn poll_payload(&mut self) -> Polled {
        match self.try_recv() {
            Ok(payload) => Polled::Payload(payload),
            Err(AsyncTryRecvError::Empty) => Polled::Idle,
            Err(AsyncTryRecvError::Disconnected) => Polled::Closed,
        }
    }
}

impl PayloadQueue for Receiver<String> {
    fn poll_payload(&mut self) -> Polled {
        match self.try_recv() {
            Ok(payload) => Polled::Payload(payload),
            Err(TryRecvError::Empty) => Polled::Idle,
            Err(TryRecvError::Disconnected) => Polled::Closed,
        }
    }
}

/// Input queue plus the heartbeat timer
pub struct InputSource<Q: PayloadQueue> {
    queue: Q,
    heartbeat_interval: Duration,
    last_announced: Instant,
}

impl<Q: PayloadQueue> InputSource<Q> {
    pub fn new(queue: Q, heartbeat_interval: Duration) -> Self {
        Self {
            queue,
            heartbeat_interval,
            last_announced: Instant::now(),
        }
    }

    /// Take the next payload, or emit a heartbeat if one is due
    pub fn try_next(&mut self, sink: &mut dyn EventSink) -> Polled {
        match self.queue.poll_payload() {
            Polled::Idle => {
                if self.last_announced.elapsed() > self.heartbeat_interval {
                    trace!("Session idle, announcing heartbeat");
                    self.last_announced = Instant::now();
                    if !sink.emit(OutputEvent::heartbeat_at(Utc::now())) {
                        return Polled::Closed;
                    }
                }
                Polled::Idle
            }
            other => other,
        }
    }
}
