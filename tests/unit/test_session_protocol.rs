//! Session Protocol Unit Tests
//!
//! Runs an interpreter session in-process over the in-memory channel and
//! checks the event stream the foreground would see.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pycalc::channel::{channel_pair, EventSink};
use pycalc::interp::{CalcConsole, ConsoleIo, Interpreter};
use pycalc::models::{OutputEvent, StreamKind, Submission};
use pycalc::session::{InterpreterSession, SessionOptions, Step};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct Recorder(Vec<OutputEvent>);

impl EventSink for Recorder {
    fn emit(&mut self, event: OutputEvent) -> bool {
        self.0.push(event);
        true
    }
}

fn options() -> SessionOptions {
    SessionOptions {
        heartbeat_interval: Duration::from_secs(60),
        poll_interval: Duration::from_millis(1),
        suppress_echo: true,
    }
}

fn drain(events: &mut UnboundedReceiver<OutputEvent>) -> Vec<OutputEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

fn texts(events: &[OutputEvent]) -> Vec<String> {
    events.iter().filter_map(OutputEvent::text).collect()
}

#[test]
fn test_events_follow_submission_order() {
    let (channel, endpoint) = channel_pair();
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session =
        InterpreterSession::new(CalcConsole::default(), endpoint.payloads, events_tx, options());

    for source in ["1", "2", "3"] {
        channel.send(&Submission::statement(source)).unwrap();
    }
    while session.interact() == Step::Processed {}

    assert_eq!(texts(&drain(&mut events_rx)), vec!["1\n", "2\n", "3\n"]);
}

#[test]
fn test_channel_round_trip_through_session_thread() {
    let (mut channel, endpoint) = channel_pair();
    let session = InterpreterSession::new(
        CalcConsole::default(),
        endpoint.payloads,
        endpoint.events,
        options(),
    );
    let worker = std::thread::spawn(move || session.run());

    channel.send(&Submission::statement("x = 21")).unwrap();
    channel.send(&Submission::statement("x * 2")).unwrap();

    let event = tokio_test::block_on(channel.recv()).unwrap();
    assert_eq!(event.text().as_deref(), Some("42\n"));

    channel.close();
    worker.join().unwrap();
}

#[test]
fn test_assignment_produces_no_event() {
    let (channel, endpoint) = channel_pair();
    let mut session = InterpreterSession::new(
        CalcConsole::default(),
        endpoint.payloads,
        Recorder::default(),
        options(),
    );

    channel.send(&Submission::statement("y = 1")).unwrap();
    assert_eq!(session.interact(), Step::Processed);
    assert_eq!(session.interact(), Step::Idle);
    assert_eq!(session.processed(), 1);
}

#[test]
fn test_echo_kept_when_suppression_off() {
    let (channel, endpoint) = channel_pair();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = InterpreterSession::new(
        CalcConsole::default(),
        endpoint.payloads,
        tx,
        SessionOptions {
            suppress_echo: false,
            ..options()
        },
    );

    channel.send(&Submission::statement("4+4")).unwrap();
    session.interact();

    assert_eq!(texts(&drain(&mut rx)), vec!["4+4\n", "8\n"]);
}

#[test]
fn test_stdout_and_stderr_flushed_separately() {
    let (channel, endpoint) = channel_pair();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session =
        InterpreterSession::new(CalcConsole::default(), endpoint.payloads, tx, options());

    channel
        .send(&Submission::block("print('before')\n1/0\n"))
        .unwrap();
    session.interact();

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].stream_kind(), Some(StreamKind::Stdout));
    assert_eq!(events[0].text().as_deref(), Some("before\n"));
    assert_eq!(events[1].stream_kind(), Some(StreamKind::Stderr));
}

#[test]
fn test_runaway_statements_fail_with_one_error_each() {
    let (channel, endpoint) = channel_pair();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session =
        InterpreterSession::new(CalcConsole::default(), endpoint.payloads, tx, options());
    let nested = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));

    channel.send(&Submission::statement("'a' * 10**18")).unwrap();
    channel.send(&Submission::statement(&nested)).unwrap();
    channel.send(&Submission::statement("6 * 7")).unwrap();
    while session.interact() == Step::Processed {}

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].stream_kind(), Some(StreamKind::Stderr));
    assert!(events[0]
        .text()
        .unwrap()
        .ends_with("OverflowError: repeated string is too long\n"));
    assert_eq!(events[1].stream_kind(), Some(StreamKind::Stderr));
    assert!(events[1]
        .text()
        .unwrap()
        .contains("SyntaxError: too many nested parentheses"));
    assert_eq!(events[2].text().as_deref(), Some("42\n"));
}

#[test]
fn test_idle_session_announces_heartbeat() {
    let (_channel, endpoint) = channel_pair();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session = InterpreterSession::new(
        CalcConsole::default(),
        endpoint.payloads,
        tx,
        SessionOptions {
            heartbeat_interval: Duration::from_millis(20),
            ..options()
        },
    );

    assert_eq!(session.interact(), Step::Idle);
    assert!(drain(&mut rx).is_empty());

    std::thread::sleep(Duration::from_millis(40));
    let before = chrono::Utc::now().timestamp_millis();
    assert_eq!(session.interact(), Step::Idle);
    let after = chrono::Utc::now().timestamp_millis();
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match events[0] {
        OutputEvent::Heartbeat { timestamp } => assert!((before..=after).contains(&timestamp)),
        ref other => panic!("expected a heartbeat, got {:?}", other),
    }
}

#[test]
fn test_session_finishes_when_foreground_gone() {
    let (mut channel, endpoint) = channel_pair();
    let mut session = InterpreterSession::new(
        CalcConsole::default(),
        endpoint.payloads,
        endpoint.events,
        options(),
    );

    channel.close();

    assert_eq!(session.interact(), Step::Finished);
}

/// Interpreter that records how it was driven
#[derive(Default)]
struct DriveLog {
    pushed: Vec<String>,
    blocks: Vec<String>,
    resets: usize,
}

#[derive(Clone, Default)]
struct Scripted(Arc<Mutex<DriveLog>>);

impl Interpreter for Scripted {
    fn push(&mut self, line: &str, io: &mut dyn ConsoleIo) -> bool {
        self.0.lock().unwrap().pushed.push(line.to_string());
        io.write_stdout(&format!("{}\n", line));
        io.flush_stdout();
        io.write_stdout("ok\n");
        false
    }

    fn reset_buffer(&mut self) {
        self.0.lock().unwrap().resets += 1;
    }

    fn run_code(&mut self, source: &str, _io: &mut dyn ConsoleIo) {
        self.0.lock().unwrap().blocks.push(source.to_string());
    }
}

#[test]
fn test_block_resets_accumulator_and_keeps_source_verbatim() {
    let (channel, endpoint) = channel_pair();
    let scripted = Scripted::default();
    let mut session = InterpreterSession::new(
        scripted.clone(),
        endpoint.payloads,
        Recorder::default(),
        options(),
    );

    channel.send(&Submission::statement("a")).unwrap();
    channel
        .send(&Submission::block("  indented\n\ttabbed\n"))
        .unwrap();
    while session.interact() == Step::Processed {}

    let log = scripted.0.lock().unwrap();
    assert_eq!(log.pushed, vec!["a".to_string()]);
    assert_eq!(log.blocks, vec!["  indented\n\ttabbed\n".to_string()]);
    assert_eq!(log.resets, 1);
}

#[test]
fn test_echo_filter_drops_only_the_echo() {
    let (channel, endpoint) = channel_pair();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut session =
        InterpreterSession::new(Scripted::default(), endpoint.payloads, tx, options());

    channel.send(&Submission::statement("x")).unwrap();
    session.interact();

    assert_eq!(texts(&drain(&mut rx)), vec!["ok\n"]);
}
