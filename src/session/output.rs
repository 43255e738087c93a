//! Output accumulation and echo suppression

use crate::channel::EventSink;
use crate::models::{OutputEvent, StreamKind};

/// Drops the interpreter's echo of a statement submission
///
/// The comparison is literal: the pending stdout must equal the trimmed
/// source followed by a newline. Only one echo is dropped per submission.
#[derive(Debug, Default)]
pub struct EchoFilter {
    expected: Option<String>,
}

impl EchoFilter {
    /// Arm the filter for a freshly submitted statement
    pub fn expect(&mut self, source: &str) {
        self.expected = Some(format!("{}\n", source.trim()));
    }

    pub fn clear(&mut self) {
        self.expected = None;
    }

    /// Returns `true` if `pending` is the echo and must not be forwarded.
    /// The first stdout flush after a submission consumes the expectation
    /// whether or not it matched.
    pub fn suppress(&mut self, pending: &str) -> bool {
        match self.expected.take() {
            Some(expected) => expected == pending,
            None => false,
        }
    }
}

/// Stdout and stderr accumulators of a session
#[derive(Debug, Default)]
pub struct OutputBuffers {
    stdout: String,
    stderr: String,
    echo: EchoFilter,
}

impl OutputBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, kind: StreamKind, text: &str) {
        match kind {
            StreamKind::Stdout => self.stdout.push_str(text),
            StreamKind::Stderr => self.stderr.push_str(text),
        }
    }

    pub fn pending(&self, kind: StreamKind) -> &str {
        match kind {
            StreamKind::Stdout => &self.stdout,
            StreamKind::Stderr => &self.stderr,
        }
    }

    pub fn echo_filter(&mut self) -> &mut EchoFilter {
        &mut self.echo
    }

    /// Drain one accumulator into at most one event. Returns `false` if the
    /// sink rejected the event.
    pub fn flush_stream(&mut self, kind: StreamKind, sink: &mut dyn EventSink) -> bool {
        let pending = match kind {
            StreamKind::Stdout => std::mem::take(&mut self.stdout),
            StreamKind::Stderr => std::mem::take(&mut self.stderr),
        };
        if pending.is_empty() {
            return true;
        }
        if kind == StreamKind::Stdout && self.echo.suppress(&pending) {
            trace!("Suppressed statement echo");
            return true;
        }
        sink.emit(OutputEvent::stream(kind, vec![pending]))
    }

    /// Drain both accumulators, stdout first
    pub fn flush(&mut self, sink: &mut dyn EventSink) -> bool {
        let stdout_ok = self.flush_stream(StreamKind::Stdout, sink);
        let stderr_ok = self.flush_stream(StreamKind::Stderr, sink);
        stdout_ok && stderr_ok
    }
}
