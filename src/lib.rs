//! pycalc - an inline calculator REPL for document editors
//!
//! The user types an expression into a document, presses a trigger key, and
//! the result is inserted below it. Evaluation happens in a background
//! session so the editor never blocks, and a session that hangs can always
//! be killed and replaced.
//!
//! ## Module Organization
//!
//! ### Protocol
//!
//! - [`channel`] - Execution channel between foreground and session, wire framing
//! - [`session`] - Background interpreter session: polling input, heartbeats,
//!   output multiplexing, echo suppression, worker process entry
//! - [`backend`] - Where sessions run (child process or thread) and how they die
//! - [`watchdog`] - Liveness watchdog on the foreground
//! - [`supervisor`] - Session lifecycle, rendering, editor triggers
//! - [`plugin`] - Foreground event loop
//!
//! ### Support
//!
//! - [`interp`] - Bundled calculator interpreter
//! - [`config`] - Configuration loading and persisted plugin state
//! - [`models`] - Submissions, output events, session records
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Architecture
//!
//! ```text
//!  Editor ──▶ plugin loop ──▶ Supervisor ──send──▶ ExecutionChannel ──▶ Session
//!    ▲                            │  ▲                                    │
//!    └──── insert / notice ───────┘  └────────── OutputEvent ◀────────────┘
//!                                 │
//!                              Watchdog
//! ```
//!
//! - **Foreground:** one cooperative tokio task, never blocking
//! - **Session:** one child process (`pycalc worker`) or one thread, running
//!   a single-threaded polling loop
//!
//! ## Quick Start
//!
//! ```no_run
//! use pycalc::{backend, Supervisor, StateStore};
//!
//! # async fn demo() -> pycalc::Result<()> {
//! let config = pycalc::load_config(None);
//! let backend = backend::from_config(&config.session);
//! let mut supervisor = Supervisor::new(backend, config, StateStore::default_location());
//! supervisor.start().await?;
//! supervisor.submit("1+1", pycalc::SubmissionMode::Statement);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

pub mod backend;
pub mod channel;
pub mod config;
pub mod error;
pub mod interp;
pub mod models;
pub mod plugin;
pub mod session;
pub mod supervisor;
pub mod watchdog;

use std::path::Path;

// Re-exports for core functionality
pub use config::loader::ConfigLoader;
pub use config::state::{PluginState, StateStore};
pub use config::{BackendKind, Config};
pub use error::{Error, Result};
pub use models::{OutputEvent, Submission, SubmissionMode};
pub use plugin::{run_plugin_loop, HostCommand};
pub use supervisor::{MenuItem, Supervisor};
pub use watchdog::Watchdog;

// Version information
/// The current version of pycalc from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The application description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Load configuration from `path`, or from the default search path when
/// `None`. Any failure falls back to the defaults with a warning.
pub fn load_config(path: Option<&Path>) -> Config {
    let mut loader = ConfigLoader::new();
    let loaded = match path {
        Some(path) => loader.load_from_path(path),
        None => loader.load_with_options(Default::default()),
    };

    match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            Config::default()
        }
    }
}
