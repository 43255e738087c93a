//! Execution Channel
//!
//! Duplex message link between the foreground supervisor and the background
//! interpreter session. Submissions travel one way as tag-prefixed strings,
//! output events travel back as [`OutputEvent`] values. Both directions are
//! unbounded FIFO queues, so sending never blocks and delivery order matches
//! send order.
//!
//! ```text
//! ┌──────────────────┐          ┌──────────────────┐
//! │    Foreground    │          │     Session      │
//! │ (ExecutionChannel)│         │ (WorkerEndpoint) │
//! │                  │          │                  │
//! │  send ─────────────────────▶│  payloads        │
//! │                  │          │                  │
//! │  recv ◀─────────────────────│  events          │
//! └──────────────────┘          └──────────────────┘
//! ```

pub mod codec;

use std::io::Write;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{Error, Result};
use crate::models::{OutputEvent, Submission};

/// Foreground end of the channel
pub struct ExecutionChannel {
    /// Submission payloads towards the session
    outbound: Option<UnboundedSender<String>>,
    /// Output events from the session
    inbound: UnboundedReceiver<OutputEvent>,
}

/// Background end of the channel
pub struct WorkerEndpoint {
    /// Raw submission payloads, in send order
    pub payloads: UnboundedReceiver<String>,
    /// Output events towards the foreground
    pub events: UnboundedSender<OutputEvent>,
}

/// Create a connected in-memory channel pair
pub fn channel_pair() -> (ExecutionChannel, WorkerEndpoint) {
    let (payload_tx, payload_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<OutputEvent>();

    (
        ExecutionChannel::from_channels(payload_tx, event_rx),
        WorkerEndpoint {
            payloads: payload_rx,
            events: event_tx,
        },
    )
}

impl ExecutionChannel {
    /// Create a channel from existing queues
    pub fn from_channels(
        outbound: UnboundedSender<String>,
        inbound: UnboundedReceiver<OutputEvent>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound,
        }
    }

    /// Enqueue a submission. Fire-and-forget: no acknowledgement is returned.
    pub fn send(&self, submission: &Submission) -> Result<()> {
        self.send_raw(submission.encode())
    }

    /// Enqueue an already encoded payload
    pub fn send_raw(&self, payload: String) -> Result<()> {
        let sender = self.outbound.as_ref().ok_or(Error::ChannelClosed)?;
        sender.send(payload).map_err(|_| Error::ChannelClosed)
    }

    /// Receive the next event, waiting if necessary
    pub async fn recv(&mut self) -> Option<OutputEvent> {
        self.inbound.recv().await
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Option<OutputEvent> {
        self.inbound.try_recv().ok()
    }

    /// Invoke `handler` once per event, in arrival order, until the
    /// session side goes away or the channel is closed.
    pub async fn on_receive<F>(&mut self, mut handler: F)
    where
        F: FnMut(OutputEvent),
    {
        while let Some(event) = self.inbound.recv().await {
            handler(event);
        }
    }

    /// Detach the channel. Anything not yet processed by the session is
    /// abandoned, and no further events are delivered.
    pub fn close(&mut self) {
        self.outbound = None;
        self.inbound.close();
        let dropped = self.drain();
        if dropped > 0 {
            debug!("Discarded {} undelivered output events on close", dropped);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbound
            .as_ref()
            .map_or(true, |sender| sender.is_closed())
    }

    /// Drop all pending inbound events, returning how many were discarded
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.inbound.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

/// Destination for events produced on the session side
pub trait EventSink: Send {
    /// Deliver one event. Returns `false` once the foreground is gone.
    fn emit(&mut self, event: OutputEvent) -> bool;
}

impl EventSink for UnboundedSender<OutputEvent> {
    fn emit(&mut self, event: OutputEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Writes each event as one JSON line, for the worker process's stdout
pub struct JsonLineSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> EventSink for JsonLineSink<W> {
    fn emit(&mut self, event: OutputEvent) -> bool {
        let line = match codec::encode_event_line(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping unencodable output event: {}", e);
                return true;
            }
        };

        match writeln!(self.writer, "{}", line).and_then(|_| self.writer.flush()) {
            Ok(()) => true,
            Err(e) => {
                debug!("Event sink write failed: {}", e);
                false
            }
        }
    }
}
