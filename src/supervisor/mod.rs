//! Session Supervisor
//!
//! Foreground owner of the single background session. It formats and sends
//! submissions, renders whatever comes back into the editor, keeps the
//! watchdog informed, and replaces the session when asked to. At most one
//! session exists at any time: the old one is always terminated before a
//! new one is launched.

pub mod diagnostics;
pub mod host;

use tokio::time::Instant;

use crate::backend::{SessionBackend, SessionHandle};
use crate::config::state::{PluginState, StateStore};
use crate::config::Config;
use crate::error::Result;
use crate::models::{OutputEvent, SessionInfo, Submission, SubmissionMode};
use crate::watchdog::Watchdog;

pub use host::{Editor, Host, Position, Selection, TextDocument};

const MENU_ENABLED: &str = "pycalc [✓]";
const MENU_DISABLED: &str = "pycalc [×]";
const MENU_SELECTED: &str = "pycalc selected";

/// Entries the plugin contributes to the editor menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    /// Shown while enabled; clicking disables
    Enabled,
    /// Shown while disabled; clicking enables
    Disabled,
    /// Run the current selection as a block
    ExecuteSelection,
}

impl MenuItem {
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Enabled => MENU_ENABLED,
            MenuItem::Disabled => MENU_DISABLED,
            MenuItem::ExecuteSelection => MENU_SELECTED,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            MENU_ENABLED => Some(MenuItem::Enabled),
            MENU_DISABLED => Some(MenuItem::Disabled),
            MENU_SELECTED => Some(MenuItem::ExecuteSelection),
            _ => None,
        }
    }
}

pub struct Supervisor {
    backend: Box<dyn SessionBackend>,
    session: Option<SessionHandle>,
    /// Set once the current session's event stream has ended
    stream_ended: bool,
    watchdog: Watchdog,
    state: PluginState,
    store: StateStore,
    config: Config,
}

impl Supervisor {
    /// Create a supervisor. No session exists until [`Supervisor::start`].
    pub fn new(backend: Box<dyn SessionBackend>, config: Config, store: StateStore) -> Self {
        let state = store.load();
        info!(
            "Supervisor created ({} backend, enabled: {})",
            backend.kind(),
            state.enabled
        );
        Self {
            backend,
            session: None,
            stream_ended: false,
            watchdog: Watchdog::new(config.watchdog.threshold()),
            state,
            store,
            config,
        }
    }

    /// Plugin activation: launch the first session
    pub async fn start(&mut self) -> Result<()> {
        self.restart().await
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session.as_ref().map(|handle| &handle.info)
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Send code to the session. Results arrive later as events. Returns
    /// `false` if there was no live session to send to.
    pub fn submit(&mut self, source: &str, mode: SubmissionMode) -> bool {
        let Some(handle) = self.session.as_mut() else {
            warn!("Dropping {:?} submission: no live session", mode);
            return false;
        };

        match handle.channel.send(&Submission::new(mode, source)) {
            Ok(()) => {
                handle.info.submissions_sent += 1;
                debug!(
                    "Submitted {:?} to session {} ({} bytes)",
                    mode,
                    handle.info.id,
                    source.len()
                );
                true
            }
            Err(e) => {
                warn!("Submission to session {} failed: {}", handle.info.id, e);
                false
            }
        }
    }

    /// Wait for the next event of the current session. Pends forever while
    /// there is no session or its stream has ended.
    pub async fn next_event(&mut self) -> Option<OutputEvent> {
        let handle = match self.session.as_mut() {
            Some(handle) if !self.stream_ended => handle,
            _ => return std::future::pending().await,
        };

        match handle.channel.recv().await {
            Some(event) => Some(event),
            None => {
                warn!("Session {} stopped producing events", handle.info.id);
                self.stream_ended = true;
                None
            }
        }
    }

    /// Render one event and feed the watchdog
    pub fn handle_event(&mut self, event: OutputEvent, host: &mut dyn Host) {
        self.watchdog.reset();
        if let Some(handle) = self.session.as_mut() {
            handle.info.events_received += 1;
        }

        match event {
            OutputEvent::Heartbeat { timestamp } => {
                trace!("Heartbeat at {}", timestamp);
            }
            OutputEvent::Stdout { chunks } => {
                let text = chunks.concat();
                match host.active_editor() {
                    Some(editor) => {
                        let at = editor.cursor();
                        editor.insert_text(at, &text);
                        editor.set_cursor(at.advanced_by(&text));
                        host.output_inserted(&text);
                    }
                    None => debug!("No active editor, dropping {} bytes of output", text.len()),
                }
            }
            OutputEvent::Stderr { chunks } => {
                let text = chunks.concat();
                let notice = diagnostics::shorten(&text);
                debug!("Session error: {}", text.trim_end());
                host.show_notice(&format!("{}{}", self.config.editor.notice_prefix, notice));
            }
            OutputEvent::Malformed { raw } => {
                warn!("Malformed message from session: {:?}", raw);
                let preview: String = raw.chars().take(80).collect();
                host.show_notice(&format!(
                    "{}Malformed output from session: {}",
                    self.config.editor.notice_prefix, preview
                ));
            }
        }
    }

    /// Terminate the current session, if any, and launch a fresh one.
    /// Interpreter state and queued submissions are lost.
    pub async fn restart(&mut self) -> Result<()> {
        self.terminate_session();

        let handle = self.backend.launch().await?;
        info!(
            "Session {} live ({} backend)",
            handle.info.id, handle.info.backend
        );
        self.session = Some(handle);
        self.stream_ended = false;
        self.watchdog.rearm();
        Ok(())
    }

    fn terminate_session(&mut self) {
        if let Some(handle) = self.session.take() {
            let id = handle.info.id.clone();
            match handle.terminate() {
                Ok(()) => info!("Terminated session {}", id),
                Err(e) => warn!("Failed to terminate session {}: {}", id, e),
            }
        }
    }

    /// Turn the trigger key back on. The session is recreated.
    pub async fn enable(&mut self) -> Result<()> {
        self.restart().await?;
        self.set_enabled(true)
    }

    /// Turn the trigger key off. The session keeps running.
    pub fn disable(&mut self) -> Result<()> {
        self.set_enabled(false)
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.state.enabled = enabled;
        info!("Implicit execution {}", if enabled { "enabled" } else { "disabled" });
        self.store.save(&self.state)
    }

    /// Keystroke hook. On the trigger key the line before the cursor line is
    /// run as a statement.
    pub fn on_key(&mut self, key: &str, host: &mut dyn Host) -> bool {
        if key != self.config.editor.trigger_key || !self.state.enabled {
            return false;
        }
        let Some(editor) = host.active_editor() else {
            return false;
        };

        let cursor = editor.cursor();
        if cursor.line == 0 {
            return false;
        }
        match editor.line_text(cursor.line - 1) {
            Some(line) => self.submit(&line, SubmissionMode::Statement),
            None => false,
        }
    }

    /// Run the current selection as a block. Always available, enabled or
    /// not.
    ///
    /// An empty selection (or no active editor) submits nothing, leaves the
    /// document and cursor as they are, and returns `false`.
    pub fn execute_selection(&mut self, host: &mut dyn Host) -> bool {
        let Some(editor) = host.active_editor() else {
            return false;
        };
        let Some(selection) = editor.selection().filter(|s| !s.is_empty()) else {
            debug!("Execute selection: nothing selected");
            return false;
        };

        let end = selection.end();
        let source = editor.text_range(selection.start(), end);
        if source.ends_with('\n') {
            editor.set_cursor(end);
        } else {
            editor.insert_text(end, "\n");
            editor.set_cursor(Position::new(end.line + 1, 0));
        }

        self.submit(&source, SubmissionMode::Block)
    }

    /// Check the watchdog deadline; on expiry ask the user. Returns `true`
    /// if a prompt was raised.
    pub fn check_watchdog(&mut self, now: Instant, host: &mut dyn Host) -> bool {
        if self.watchdog.fire(now) {
            host.request_confirmation(&self.config.watchdog.prompt_message);
            true
        } else {
            false
        }
    }

    /// The user answered the watchdog prompt
    pub async fn resolve_watchdog(&mut self, terminate: bool) -> Result<()> {
        if !self.watchdog.is_prompting() {
            debug!("Ignoring watchdog answer with no prompt open");
            return Ok(());
        }
        self.watchdog.resolve();
        if terminate {
            info!("User chose to terminate the unresponsive session");
            self.restart().await?;
        } else {
            info!("User chose to keep waiting");
        }
        Ok(())
    }

    /// Menu entries for the current state
    pub fn menu_items(&self) -> Vec<MenuItem> {
        let toggle = if self.state.enabled {
            MenuItem::Enabled
        } else {
            MenuItem::Disabled
        };
        vec![toggle, MenuItem::ExecuteSelection]
    }

    pub async fn activate_menu(&mut self, item: MenuItem, host: &mut dyn Host) -> Result<()> {
        match item {
            MenuItem::Enabled => self.disable(),
            MenuItem::Disabled => self.enable().await,
            MenuItem::ExecuteSelection => {
                self.execute_selection(host);
                Ok(())
            }
        }
    }

    /// Plugin teardown
    pub fn shutdown(&mut self) {
        self.terminate_session();
        self.watchdog.disarm();
        info!("Supervisor shut down");
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.terminate_session();
    }
}
