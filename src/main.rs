//! pycalc - inline calculator REPL
//!
//! `pycalc worker` is the background session process. Without the mode word
//! the binary runs a line-oriented demo host: stdin lines are typed into an
//! in-memory document and evaluated the way an editor integration would.

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use pycalc::backend;
use pycalc::session::worker;
use pycalc::supervisor::{Editor, Host, TextDocument};
use pycalc::{BackendKind, HostCommand, MenuItem, StateStore, Supervisor};

/// Application configuration
#[derive(Debug, Default)]
struct AppArgs {
    /// Configuration file path
    config_path: Option<PathBuf>,
    /// Enable debug mode
    debug: bool,
    /// Backend override
    backend: Option<BackendKind>,
    /// Plugin state file override
    state_path: Option<PathBuf>,
}

impl AppArgs {
    /// Parse command line arguments
    fn parse(args: &[String]) -> Result<Self> {
        let mut app_args = AppArgs::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    let path = args.get(i + 1).context("Missing config file path")?;
                    app_args.config_path = Some(PathBuf::from(path));
                    i += 1;
                }
                "--debug" | "-d" => {
                    app_args.debug = true;
                }
                "--backend" | "-b" => {
                    let name = args.get(i + 1).context("Missing backend name")?;
                    let kind = name.parse::<BackendKind>().map_err(anyhow::Error::msg)?;
                    app_args.backend = Some(kind);
                    i += 1;
                }
                "--state" => {
                    let path = args.get(i + 1).context("Missing state file path")?;
                    app_args.state_path = Some(PathBuf::from(path));
                    i += 1;
                }
                "--help" | "-h" => {
                    print_help();
                    process::exit(0);
                }
                "--version" | "-v" => {
                    println!("{} v{}", pycalc::NAME, pycalc::VERSION);
                    process::exit(0);
                }
                arg if arg.starts_with('-') => {
                    anyhow::bail!("Unknown option: {}", arg);
                }
                _ => {
                    warn!("Ignoring positional argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Ok(app_args)
    }
}

/// Print help information
fn print_help() {
    println!("{} - {}", pycalc::NAME, pycalc::DESCRIPTION);
    println!();
    println!("USAGE:");
    println!("    pycalc [OPTIONS]");
    println!("    pycalc worker [--heartbeat-ms <MS>] [--poll-ms <MS>] [--no-echo]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <PATH>     Path to configuration file");
    println!("    -d, --debug             Enable debug logging");
    println!("    -b, --backend <KIND>    Session backend: process or thread");
    println!("        --state <PATH>      Plugin state file (enabled flag)");
    println!("    -h, --help              Print this help message");
    println!("    -v, --version           Print version information");
    println!();
    println!("DEMO COMMANDS:");
    println!("    <code>                  Type a line and press Enter");
    println!("    :block ... :end         Paste a block, select it and run it");
    println!("    :on / :off              Enable or disable Enter evaluation");
    println!("    :y / :n                 Answer the watchdog prompt");
    println!("    :restart                Replace the session");
    println!("    :quit                   Exit");
    println!();
    println!("CONFIGURATION:");
    println!("    pycalc looks for configuration files in the following order:");
    println!("    1. Path specified with --config");
    println!("    2. $XDG_CONFIG_HOME/pycalc/config.toml (or .json)");
    println!("    3. ~/.config/pycalc/config.toml");
    println!("    4. ~/.pycalc/config.toml");
    println!("    5. ./.pycalc/config.toml");
    println!("    6. Built-in defaults");
    println!();
    println!("ENVIRONMENT:");
    println!("    PYCALC_CONFIG          Path to configuration file");
    println!("    PYCALC_DEBUG           Enable debug mode (1 or true)");
    println!("    RUST_LOG               Set logging level (error, warn, info, debug, trace)");
}

fn init_logging(debug: bool) {
    let debug = debug
        || env::var("PYCALC_DEBUG").is_ok_and(|v| v == "1" || v.to_lowercase() == "true");
    let log_level = if debug { "debug" } else { "info" };

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if worker::is_worker_mode() {
        init_logging(false);
        let config = worker::parse_worker_args(args.into_iter().skip(2));
        return worker::run(&config).context("worker session failed");
    }

    let app_args = AppArgs::parse(&args).unwrap_or_else(|e| {
        eprintln!("Failed to parse arguments: {}", e);
        print_help();
        process::exit(1);
    });
    init_logging(app_args.debug);

    info!("Starting {} v{}", pycalc::NAME, pycalc::VERSION);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_demo(app_args))
}

async fn run_demo(args: AppArgs) -> Result<()> {
    let config_path = args
        .config_path
        .clone()
        .or_else(|| env::var("PYCALC_CONFIG").ok().map(PathBuf::from));
    let mut config = pycalc::load_config(config_path.as_deref());
    if let Some(kind) = args.backend {
        config.session.backend = kind;
    }
    debug!("Effective configuration: {:?}", config);

    let store = args
        .state_path
        .map(StateStore::new)
        .unwrap_or_else(StateStore::default_location);
    let backend = backend::from_config(&config.session);
    let mut supervisor = Supervisor::new(backend, config, store);
    supervisor
        .start()
        .await
        .context("failed to start interpreter session")?;

    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_commands(command_tx));

    let mut host = ConsoleHost::default();
    println!("pycalc demo: type expressions, :help for commands");
    pycalc::run_plugin_loop(&mut supervisor, &mut host, &mut command_rx).await;
    Ok(())
}

/// Translate stdin lines into host commands
async fn read_commands(commands: mpsc::UnboundedSender<HostCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut block: Option<String> = None;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        if let Some(text) = block.as_mut() {
            if line.trim() == ":end" {
                let text = block.take().unwrap_or_default();
                let sent = commands
                    .send(HostCommand::Insert { text, select: true })
                    .and_then(|_| commands.send(HostCommand::ExecuteSelection));
                if sent.is_err() {
                    return;
                }
            } else {
                text.push_str(&line);
                text.push('\n');
            }
            continue;
        }

        let command = match line.trim() {
            ":quit" | ":q" => break,
            ":block" => {
                block = Some(String::new());
                continue;
            }
            ":help" => {
                print_help();
                continue;
            }
            ":on" => HostCommand::Menu(MenuItem::Disabled),
            ":off" => HostCommand::Menu(MenuItem::Enabled),
            ":y" => HostCommand::WatchdogAnswer(true),
            ":n" => HostCommand::WatchdogAnswer(false),
            ":restart" => HostCommand::Restart,
            _ => {
                let typed = HostCommand::Insert {
                    text: format!("{}\n", line),
                    select: false,
                };
                if commands.send(typed).is_err() {
                    return;
                }
                HostCommand::Key("Enter".to_string())
            }
        };
        if commands.send(command).is_err() {
            return;
        }
    }

    let _ = commands.send(HostCommand::Shutdown);
}

/// Demo host: one in-memory document, notices on stderr
#[derive(Default)]
struct ConsoleHost {
    document: TextDocument,
}

impl Host for ConsoleHost {
    fn active_editor(&mut self) -> Option<&mut dyn Editor> {
        Some(&mut self.document)
    }

    fn show_notice(&mut self, text: &str) {
        eprintln!("{}", text);
    }

    fn request_confirmation(&mut self, message: &str) {
        println!("{} [:y/:n]", message);
    }

    fn output_inserted(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }
}
