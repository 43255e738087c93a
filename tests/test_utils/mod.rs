//! Test Utilities and Mocks
//!
//! Shared fakes for the integration tests: a backend whose sessions are
//! driven by the test itself, and a host that records what the plugin did.

#![allow(dead_code)]

pub mod fake_backend;

// Re-exports for convenience
pub use fake_backend::{FakeBackend, FakeSession, LaunchLog};
pub use recording_host::{HostLog, RecordingHost};

use pycalc::{Config, StateStore, Supervisor};
use tempfile::TempDir;

/// Supervisor over a fake backend with its state file in a temp dir
pub fn create_test_supervisor(config: Config) -> (Supervisor, LaunchLog, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let store = StateStore::new(temp_dir.path().join("state.json"));
    let backend = FakeBackend::new();
    let launches = backend.launches();
    let supervisor = Supervisor::new(Box::new(backend), config, store);
    (supervisor, launches, temp_dir)
}

/// Payloads received so far by the `index`-th launched session
pub fn payloads_of(launches: &LaunchLog, index: usize) -> Vec<String> {
    launches.lock().unwrap()[index].drain_payloads()
}
