//! Interpreter Session
//!
//! The background half of the protocol. A session owns one interpreter and
//! runs a single-threaded cooperative loop: poll for the next payload, run
//! it to completion, flush output, and sleep for the poll period when idle.
//! While the interpreter is busy nothing else happens; in particular no
//! heartbeats are sent, which is exactly what the foreground watchdog
//! watches for.

pub mod input;
pub mod output;
pub mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::channel::EventSink;
use crate::config::SessionConfig;
use crate::interp::{ConsoleIo, Interpreter};
use crate::models::{StreamKind, Submission, SubmissionMode};

pub use input::{InputSource, PayloadQueue, Polled};
pub use output::{EchoFilter, OutputBuffers};

/// Shared flag raised when a session has been abandoned
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Timing and echo options for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    /// Whether the interpreter echoes statements, so the echo must be dropped
    pub suppress_echo: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(10),
            suppress_echo: true,
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            suppress_echo: config.echo_input,
        }
    }
}

/// Outcome of one [`InterpreterSession::interact`] step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A submission was run to completion
    Processed,
    /// Nothing to do this round
    Idle,
    /// The session should stop
    Finished,
}

/// [`ConsoleIo`] routing interpreter output through the session buffers
struct SessionIo<'a> {
    buffers: &'a mut OutputBuffers,
    sink: &'a mut dyn EventSink,
    cancel: &'a CancelFlag,
    sink_alive: &'a mut bool,
}

impl ConsoleIo for SessionIo<'_> {
    fn write_stdout(&mut self, text: &str) {
        self.buffers.write(StreamKind::Stdout, text);
    }

    fn flush_stdout(&mut self) {
        if !self.buffers.flush_stream(StreamKind::Stdout, self.sink) {
            *self.sink_alive = false;
        }
    }

    fn write_stderr(&mut self, text: &str) {
        self.buffers.write(StreamKind::Stderr, text);
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled() || !*self.sink_alive
    }
}

/// A live interpreter wired to an input queue and an event sink
pub struct InterpreterSession<I, Q, S>
where
    I: Interpreter,
    Q: PayloadQueue,
    S: EventSink,
{
    interpreter: I,
    input: InputSource<Q>,
    output: OutputBuffers,
    sink: S,
    cancel: CancelFlag,
    options: SessionOptions,
    sink_alive: bool,
    processed: u64,
}

impl<I, Q, S> InterpreterSession<I, Q, S>
where
    I: Interpreter,
    Q: PayloadQueue,
    S: EventSink,
{
    pub fn new(interpreter: I, queue: Q, sink: S, options: SessionOptions) -> Self {
        Self {
            interpreter,
            input: InputSource::new(queue, options.heartbeat_interval),
            output: OutputBuffers::new(),
            sink,
            cancel: CancelFlag::new(),
            options,
            sink_alive: true,
            processed: 0,
        }
    }

    /// Share an externally owned cancel flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Number of submissions run so far
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Poll once and run whatever was received
    pub fn interact(&mut self) -> Step {
        if self.cancel.is_cancelled() || !self.sink_alive {
            return Step::Finished;
        }

        match self.input.try_next(&mut self.sink) {
            Polled::Payload(payload) => {
                self.process(&payload);
                self.processed += 1;
                if self.sink_alive {
                    Step::Processed
                } else {
                    Step::Finished
                }
            }
            Polled::Idle => Step::Idle,
            Polled::Closed => Step::Finished,
        }
    }

    /// Run until the input closes, the sink goes away or the session is
    /// cancelled
    pub fn run(mut self) {
        debug!("Interpreter session loop started");
        loop {
            match self.interact() {
                Step::Processed => {}
                Step::Idle => thread::sleep(self.options.poll_interval),
                Step::Finished => break,
            }
        }
        debug!(
            "Interpreter session loop finished after {} submissions",
            self.processed
        );
    }

    fn process(&mut self, payload: &str) {
        let submission = match Submission::decode(payload) {
            Ok(submission) => submission,
            Err(e) => {
                warn!("Rejected submission: {}", e);
                self.output.write(StreamKind::Stderr, &format!("{}\n", e));
                self.flush();
                return;
            }
        };

        trace!(
            "Running {:?} submission ({} bytes)",
            submission.mode,
            submission.source.len()
        );

        let mut io = SessionIo {
            buffers: &mut self.output,
            sink: &mut self.sink,
            cancel: &self.cancel,
            sink_alive: &mut self.sink_alive,
        };

        match submission.mode {
            SubmissionMode::Statement => {
                if self.options.suppress_echo {
                    io.buffers.echo_filter().expect(&submission.source);
                }
                self.interpreter.push(&submission.source, &mut io);
            }
            SubmissionMode::Block => {
                io.buffers.echo_filter().clear();
                self.interpreter.reset_buffer();
                self.interpreter.run_code(&submission.source, &mut io);
            }
        }

        self.flush();
    }

    fn flush(&mut self) {
        if !self.output.flush(&mut self.sink) {
            self.sink_alive = false;
        }
        self.output.echo_filter().clear();
    }
}
