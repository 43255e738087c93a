//! Plugin event loop
//!
//! Everything on the foreground happens on one cooperative task. The loop
//! waits on three things at once and handles whichever comes first:
//!
//! ```text
//!                 ┌──────────────────────┐
//!  host commands ─▶                      │
//!  session events ─▶   plugin loop       ├──▶ Supervisor ──▶ Host / Editor
//!  watchdog timer ─▶                      │
//!                 └──────────────────────┘
//! ```
//!
//! Nothing in the loop blocks: submissions are fire-and-forget and the
//! watchdog prompt is answered with a later [`HostCommand::WatchdogAnswer`].

use futures::future::OptionFuture;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::supervisor::{Host, MenuItem, Supervisor};

/// Requests from the hosting editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Text typed or pasted at the cursor, optionally left selected
    Insert { text: String, select: bool },
    /// A key was pressed after any text it produced was applied
    Key(String),
    /// Run the selection as a block
    ExecuteSelection,
    /// A plugin menu entry was clicked
    Menu(MenuItem),
    /// Answer to the watchdog prompt; `true` terminates the session
    WatchdogAnswer(bool),
    /// Replace the session unconditionally
    Restart,
    /// Tear the plugin down
    Shutdown,
}

/// Run the plugin until shutdown or until the host goes away
pub async fn run_plugin_loop(
    supervisor: &mut Supervisor,
    host: &mut dyn Host,
    commands: &mut mpsc::UnboundedReceiver<HostCommand>,
) {
    info!("Starting plugin loop");

    loop {
        let deadline = supervisor.watchdog().deadline();
        let watchdog_timer: OptionFuture<_> = deadline.map(sleep_until).into();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("Host command channel closed");
                    break;
                };
                if !handle_command(supervisor, host, command).await {
                    break;
                }
            }
            event = supervisor.next_event() => {
                if let Some(event) = event {
                    supervisor.handle_event(event, host);
                }
            }
            Some(()) = watchdog_timer => {
                supervisor.check_watchdog(Instant::now(), host);
            }
        }
    }

    supervisor.shutdown();
    info!("Plugin loop finished");
}

/// Returns `false` when the loop should stop
async fn handle_command(
    supervisor: &mut Supervisor,
    host: &mut dyn Host,
    command: HostCommand,
) -> bool {
    debug!("Host command: {:?}", command);
    let result = match command {
        HostCommand::Insert { text, select } => {
            if let Some(editor) = host.active_editor() {
                let at = editor.cursor();
                let end = at.advanced_by(&text);
                editor.insert_text(at, &text);
                if select {
                    editor.select(at, end);
                } else {
                    editor.set_cursor(end);
                }
            }
            Ok(())
        }
        HostCommand::Key(key) => {
            supervisor.on_key(&key, host);
            Ok(())
        }
        HostCommand::ExecuteSelection => {
            supervisor.execute_selection(host);
            Ok(())
        }
        HostCommand::Menu(item) => supervisor.activate_menu(item, host).await,
        HostCommand::WatchdogAnswer(terminate) => supervisor.resolve_watchdog(terminate).await,
        HostCommand::Restart => supervisor.restart().await,
        HostCommand::Shutdown => return false,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        host.show_notice(&format!(
            "{}{}",
            supervisor.config().editor.notice_prefix,
            e
        ));
    }
    true
}
