//! Process Session Integration Tests
//!
//! Launches real `pycalc worker` child processes and talks to them over the
//! JSON-line pipe protocol.

use std::time::Duration;

use pycalc::backend::{ProcessBackend, SessionBackend, SessionHandle};
use pycalc::channel::ExecutionChannel;
use pycalc::config::SessionConfig;
use pycalc::models::{OutputEvent, StreamKind, Submission};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn backend_with(config: SessionConfig) -> ProcessBackend {
    ProcessBackend::new(&config).with_program(env!("CARGO_BIN_EXE_pycalc"))
}

fn backend() -> ProcessBackend {
    backend_with(SessionConfig {
        poll_interval_ms: 5,
        ..SessionConfig::default()
    })
}

/// Next non-heartbeat event
async fn next_output(channel: &mut ExecutionChannel) -> OutputEvent {
    loop {
        let event = timeout(WAIT, channel.recv())
            .await
            .expect("timed out waiting for worker output")
            .expect("worker closed its event stream");
        if !event.is_heartbeat() {
            return event;
        }
    }
}

async fn launch() -> SessionHandle {
    backend().launch().await.expect("worker should spawn")
}

#[tokio::test]
async fn test_statement_round_trip() {
    let mut handle = launch().await;
    assert!(handle.info.pid.is_some());

    handle.channel.send(&Submission::statement("1+1")).unwrap();

    let event = next_output(&mut handle.channel).await;
    assert_eq!(event.stream_kind(), Some(StreamKind::Stdout));
    assert_eq!(event.text().as_deref(), Some("2\n"));

    handle.terminate().unwrap();
}

#[tokio::test]
async fn test_state_shared_between_statements_and_blocks() {
    let mut handle = launch().await;

    handle.channel.send(&Submission::statement("x = 5")).unwrap();
    handle
        .channel
        .send(&Submission::block("for i in range(3):\n    x = x + i\nprint(x * 2)\n"))
        .unwrap();

    let event = next_output(&mut handle.channel).await;
    assert_eq!(event.text().as_deref(), Some("16\n"));

    handle.terminate().unwrap();
}

#[tokio::test]
async fn test_error_arrives_on_stderr() {
    let mut handle = launch().await;

    handle.channel.send(&Submission::statement("1/0")).unwrap();

    let event = next_output(&mut handle.channel).await;
    assert_eq!(event.stream_kind(), Some(StreamKind::Stderr));
    let text = event.text().unwrap();
    assert!(text.contains("File \"<stdin>\", line 1, in <module>"));
    assert!(text.contains("ZeroDivisionError: division by zero"));

    // The session survives the error
    handle.channel.send(&Submission::statement("3*3")).unwrap();
    let event = next_output(&mut handle.channel).await;
    assert_eq!(event.text().as_deref(), Some("9\n"));

    handle.terminate().unwrap();
}

#[tokio::test]
async fn test_idle_worker_sends_heartbeats() {
    let mut handle = backend_with(SessionConfig {
        heartbeat_interval_ms: 100,
        poll_interval_ms: 5,
        ..SessionConfig::default()
    })
    .launch()
    .await
    .unwrap();

    let event = timeout(WAIT, handle.channel.recv()).await.unwrap().unwrap();
    assert!(event.is_heartbeat());

    handle.terminate().unwrap();
}

#[tokio::test]
async fn test_busy_worker_can_be_replaced() {
    let backend = backend();
    let mut stuck = backend.launch().await.unwrap();
    stuck
        .channel
        .send(&Submission::block("while True:\n    pass\n"))
        .unwrap();
    assert!(stuck.is_alive());

    stuck.terminate().unwrap();

    let mut fresh = backend.launch().await.unwrap();
    fresh.channel.send(&Submission::statement("40+2")).unwrap();
    let event = next_output(&mut fresh.channel).await;
    assert_eq!(event.text().as_deref(), Some("42\n"));

    fresh.terminate().unwrap();
}

#[tokio::test]
async fn test_echo_disabled_worker() {
    let mut handle = backend_with(SessionConfig {
        echo_input: false,
        poll_interval_ms: 5,
        ..SessionConfig::default()
    })
    .launch()
    .await
    .unwrap();

    handle.channel.send(&Submission::statement("7*6")).unwrap();
    let event = next_output(&mut handle.channel).await;
    assert_eq!(event.text().as_deref(), Some("42\n"));

    handle.terminate().unwrap();
}
