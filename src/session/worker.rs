//! Worker process entry point
//!
//! `pycalc worker` runs one interpreter session over its stdio pipes. A
//! reader thread turns framed stdin lines into the payload queue; the
//! session loop runs on the main thread and writes framed events to stdout.
//! Logging must go to stderr here since stdout carries the protocol.

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use crate::channel::{codec, JsonLineSink};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::interp::CalcConsole;

use super::{InterpreterSession, SessionOptions};

/// First command-line argument selecting worker mode
pub const WORKER_MODE_ARG: &str = "worker";

pub fn is_worker_mode() -> bool {
    std::env::args().nth(1).as_deref() == Some(WORKER_MODE_ARG)
}

/// Arguments handed to a spawned worker so it uses the parent's settings
pub fn worker_args(config: &SessionConfig) -> Vec<String> {
    let mut args = vec![
        WORKER_MODE_ARG.to_string(),
        "--heartbeat-ms".to_string(),
        config.heartbeat_interval_ms.to_string(),
        "--poll-ms".to_string(),
        config.poll_interval_ms.to_string(),
    ];
    if !config.echo_input {
        args.push("--no-echo".to_string());
    }
    args
}

/// Rebuild the session settings from worker arguments (after the mode word).
/// Unknown or malformed values fall back to defaults.
pub fn parse_worker_args<I>(args: I) -> SessionConfig
where
    I: IntoIterator<Item = String>,
{
    let mut config = SessionConfig::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--heartbeat-ms" => {
                if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                    config.heartbeat_interval_ms = value;
                }
            }
            "--poll-ms" => {
                if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                    config.poll_interval_ms = value;
                }
            }
            "--no-echo" => config.echo_input = false,
            other => warn!("Ignoring unknown worker argument: {}", other),
        }
    }
    config
}

/// Run the worker until stdin closes or stdout is gone
pub fn run(config: &SessionConfig) -> Result<()> {
    let (payload_tx, payload_rx) = mpsc::channel::<String>();

    thread::Builder::new()
        .name("pycalc-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Worker stdin read failed: {}", e);
                        break;
                    }
                };
                if line.is_empty() {
                    continue;
                }
                match codec::decode_payload_line(&line) {
                    Ok(payload) => {
                        if payload_tx.send(payload).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping undecodable payload line: {}", e),
                }
            }
            debug!("Worker stdin closed");
        })?;

    let options = SessionOptions::from(config);
    let console = CalcConsole::new(config.echo_input);
    let sink = JsonLineSink::new(io::stdout());

    info!("Worker session started (pid {})", std::process::id());
    InterpreterSession::new(console, payload_rx, sink, options).run();
    Ok(())
}
