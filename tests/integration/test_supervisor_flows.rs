//! Supervisor Flow Integration Tests
//!
//! Drives the supervisor against a fake backend and a recording host:
//! trigger key, selection execution, output rendering, error notices,
//! enable/disable persistence and the plugin loop.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use pycalc::backend::ThreadBackend;
use pycalc::config::SessionConfig;
use pycalc::supervisor::{Editor, Position};
use pycalc::{
    run_plugin_loop, Config, HostCommand, MenuItem, StateStore, SubmissionMode, Supervisor,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use test_utils::{create_test_supervisor, payloads_of, RecordingHost};

#[tokio::test]
async fn test_start_launches_single_session() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    assert!(supervisor.session_info().is_none());

    supervisor.start().await.unwrap();

    assert_eq!(launches.lock().unwrap().len(), 1);
    assert!(supervisor.session_info().unwrap().is_live());
    assert!(supervisor.watchdog().deadline().is_some());
}

#[tokio::test]
async fn test_trigger_key_submits_previous_line() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("x = 5\n");

    assert!(supervisor.on_key("Enter", &mut host));

    assert_eq!(payloads_of(&launches, 0), vec!["0x = 5".to_string()]);
    assert_eq!(supervisor.session_info().unwrap().submissions_sent, 1);
}

#[tokio::test]
async fn test_trigger_key_ignored_on_first_line_or_other_keys() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("1+1");

    assert!(!supervisor.on_key("Enter", &mut host));
    assert!(!supervisor.on_key("Tab", &mut host));
    assert!(payloads_of(&launches, 0).is_empty());
}

#[tokio::test]
async fn test_trigger_key_without_editor_is_noop() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("1+1\n");
    host.editor_focused = false;

    assert!(!supervisor.on_key("Enter", &mut host));
    assert!(payloads_of(&launches, 0).is_empty());
}

#[tokio::test]
async fn test_custom_trigger_key() {
    let mut config = Config::default();
    config.editor.trigger_key = "Ctrl+Enter".to_string();
    let (mut supervisor, launches, _dir) = create_test_supervisor(config);
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("2*3\n");

    assert!(!supervisor.on_key("Enter", &mut host));
    assert!(supervisor.on_key("Ctrl+Enter", &mut host));
    assert_eq!(payloads_of(&launches, 0), vec!["02*3".to_string()]);
}

#[tokio::test]
async fn test_stdout_inserted_at_cursor() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("1+1\n");

    launches.lock().unwrap()[0].emit_stdout("2\n");
    let event = supervisor.next_event().await.unwrap();
    supervisor.handle_event(event, &mut host);

    assert_eq!(host.document.text(), "1+1\n2\n");
    assert_eq!(host.document.cursor(), Position::new(2, 0));
    assert_eq!(host.inserted(), vec!["2\n".to_string()]);
    assert_eq!(supervisor.session_info().unwrap().events_received, 1);
}

#[tokio::test]
async fn test_stderr_shown_as_shortened_notice() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("1/0\n");

    launches.lock().unwrap()[0].emit_stderr(
        "Traceback (most recent call last):\n  File \"<stdin>\", line 1, in <module>\nZeroDivisionError: division by zero\n",
    );
    let event = supervisor.next_event().await.unwrap();
    supervisor.handle_event(event, &mut host);

    assert_eq!(
        host.notices(),
        vec![
            "❌ File \"<stdin>\", line 1, in <module> ZeroDivisionError: division by zero"
                .to_string()
        ]
    );
    assert_eq!(host.document.text(), "1/0\n");
}

#[tokio::test]
async fn test_heartbeat_leaves_document_untouched() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("x = 1\n");

    launches.lock().unwrap()[0].emit_heartbeat();
    let event = supervisor.next_event().await.unwrap();
    assert!(event.is_heartbeat());
    supervisor.handle_event(event, &mut host);

    assert_eq!(host.document.text(), "x = 1\n");
    assert!(host.notices().is_empty());
}

#[tokio::test]
async fn test_execute_selection_appends_newline() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("for i in range(5):\n    x = i\nx * 2");
    let end = host.document.end();
    host.document.select(Position::new(0, 0), end);

    assert!(supervisor.execute_selection(&mut host));

    assert_eq!(
        payloads_of(&launches, 0),
        vec!["1for i in range(5):\n    x = i\nx * 2".to_string()]
    );
    assert_eq!(host.document.text(), "for i in range(5):\n    x = i\nx * 2\n");
    assert_eq!(host.document.cursor(), Position::new(3, 0));
    assert!(host.document.selection().is_none());
}

#[tokio::test]
async fn test_execute_selection_ending_in_newline() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("a = 1\nb = 2\nrest");
    host.document.select(Position::new(0, 0), Position::new(2, 0));

    assert!(supervisor.execute_selection(&mut host));

    assert_eq!(payloads_of(&launches, 0), vec!["1a = 1\nb = 2\n".to_string()]);
    assert_eq!(host.document.text(), "a = 1\nb = 2\nrest");
    assert_eq!(host.document.cursor(), Position::new(2, 0));
}

#[tokio::test]
async fn test_empty_selection_is_noop() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("1+1");

    assert!(!supervisor.execute_selection(&mut host));

    host.document.select(Position::new(0, 2), Position::new(0, 2));
    assert!(!supervisor.execute_selection(&mut host));

    assert!(payloads_of(&launches, 0).is_empty());
    assert_eq!(host.document.text(), "1+1");
}

#[tokio::test]
async fn test_disable_blocks_trigger_but_not_selection() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    supervisor.disable().unwrap();

    let mut host = RecordingHost::with_text("1+1\n");
    assert!(!supervisor.on_key("Enter", &mut host));

    host.document.select(Position::new(0, 0), Position::new(0, 3));
    assert!(supervisor.execute_selection(&mut host));
    assert_eq!(payloads_of(&launches, 0), vec!["11+1".to_string()]);

    // Disabling keeps the session running
    assert_eq!(launches.lock().unwrap().len(), 1);
    assert!(!launches.lock().unwrap()[0].is_terminated());
}

#[tokio::test]
async fn test_enable_recreates_session_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let state_path = temp_dir.path().join("state.json");
    let backend = test_utils::FakeBackend::new();
    let launches = backend.launches();
    let mut supervisor = Supervisor::new(
        Box::new(backend),
        Config::default(),
        StateStore::new(&state_path),
    );
    supervisor.start().await.unwrap();

    supervisor.disable().unwrap();
    assert!(!StateStore::new(&state_path).load().enabled);

    supervisor.enable().await.unwrap();
    assert!(StateStore::new(&state_path).load().enabled);

    let launches = launches.lock().unwrap();
    assert_eq!(launches.len(), 2);
    assert!(launches[0].is_terminated());
    assert!(!launches[1].is_terminated());
}

#[tokio::test]
async fn test_enabled_state_survives_new_supervisor() {
    let temp_dir = TempDir::new().unwrap();
    let state_path = temp_dir.path().join("state.json");

    {
        let mut supervisor = Supervisor::new(
            Box::new(test_utils::FakeBackend::new()),
            Config::default(),
            StateStore::new(&state_path),
        );
        supervisor.disable().unwrap();
    }

    let supervisor = Supervisor::new(
        Box::new(test_utils::FakeBackend::new()),
        Config::default(),
        StateStore::new(&state_path),
    );
    assert!(!supervisor.is_enabled());
    assert_eq!(
        supervisor.menu_items(),
        vec![MenuItem::Disabled, MenuItem::ExecuteSelection]
    );
}

#[tokio::test]
async fn test_menu_labels_follow_state() {
    let (mut supervisor, _launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::default();

    let labels: Vec<&str> = supervisor.menu_items().iter().map(|i| i.label()).collect();
    assert_eq!(labels, vec!["pycalc [✓]", "pycalc selected"]);

    supervisor
        .activate_menu(MenuItem::Enabled, &mut host)
        .await
        .unwrap();
    assert!(!supervisor.is_enabled());
    assert_eq!(supervisor.menu_items()[0].label(), "pycalc [×]");

    supervisor
        .activate_menu(MenuItem::Disabled, &mut host)
        .await
        .unwrap();
    assert!(supervisor.is_enabled());
}

#[tokio::test]
async fn test_shutdown_terminates_session() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();

    supervisor.shutdown();

    assert!(launches.lock().unwrap()[0].is_terminated());
    assert!(supervisor.session_info().is_none());
    assert!(!supervisor.submit("1+1", SubmissionMode::Statement));
}

#[tokio::test]
async fn test_plugin_loop_renders_session_output() {
    let (mut supervisor, launches, _dir) = create_test_supervisor(Config::default());
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::default();
    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();

    let log = host.log();
    let fake = async {
        commands_tx
            .send(HostCommand::Insert {
                text: "1+1\n".to_string(),
                select: false,
            })
            .unwrap();
        commands_tx.send(HostCommand::Key("Enter".to_string())).unwrap();

        // Wait for the submission, then answer like an interpreter would
        let payload = loop {
            let received = payloads_of(&launches, 0);
            if let Some(payload) = received.into_iter().next() {
                break payload;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(payload, "01+1");
        launches.lock().unwrap()[0].emit_stdout("2\n");

        while log.lock().unwrap().inserted.is_empty() {
            tokio::task::yield_now().await;
        }
        commands_tx.send(HostCommand::Shutdown).unwrap();
    };

    tokio::join!(
        run_plugin_loop(&mut supervisor, &mut host, &mut commands_rx),
        fake
    );

    assert_eq!(host.document.text(), "1+1\n2\n");
    assert!(launches.lock().unwrap()[0].is_terminated());
}

#[tokio::test]
async fn test_thread_backend_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let session_config = SessionConfig {
        poll_interval_ms: 1,
        ..SessionConfig::default()
    };
    let mut supervisor = Supervisor::new(
        Box::new(ThreadBackend::new(&session_config)),
        Config::default(),
        StateStore::new(temp_dir.path().join("state.json")),
    );
    supervisor.start().await.unwrap();
    let mut host = RecordingHost::with_text("y = 6\nprint(y * 7)\n");

    host.document.select(Position::new(0, 0), Position::new(2, 0));
    assert!(supervisor.execute_selection(&mut host));

    let event = loop {
        let event = supervisor.next_event().await.unwrap();
        if !event.is_heartbeat() {
            break event;
        }
    };
    supervisor.handle_event(event, &mut host);

    assert_eq!(host.document.text(), "y = 6\nprint(y * 7)\n42\n");
    supervisor.shutdown();
}
