//! `mochi-guard`: run the attention guard from a terminal, or poke at its
//! parts (rules, manual overlays, scripted focus replays) for testing.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use mochi_guard::classifier::Classifier;
use mochi_guard::commands::{rules, trigger};
use mochi_guard::config::{default_config_path, GuardConfig};
use mochi_guard::db::Database;
use mochi_guard::overlay::{ConsoleRenderer, LogNavigator, LogNotifier};
use mochi_guard::platform::{open_native_source, ChannelSource, ForegroundSource, RawFocusEvent};
use mochi_guard::remote::RemoteCommandReceiver;
use mochi_guard::service::{BackgroundServiceHost, HeadlessPlatform, ServiceComponents};
use mochi_guard::GuardError;
use serde::Deserialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "mochi-guard", version, about = "Interrupts distracting apps with a single managed overlay")]
struct Cli {
    /// Config file (defaults to guard.json in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the engine until SIGINT or SIGTERM
    Run {
        /// Also read remote payloads from stdin as JSON lines; EOF does not stop the engine
        #[arg(long)]
        stdin: bool,
    },
    /// Show an overlay through the coordinator, as the manual test path does
    Trigger {
        #[arg(long, default_value = "dismissible")]
        kind: String,
        #[arg(long, default_value = "Time to get back to focus!")]
        message: String,
        #[arg(long)]
        media: Option<String>,
        /// Show a canned reminder (`break` or `focus`) instead of --kind/--message/--media
        #[arg(long)]
        preset: Option<String>,
        /// How long to keep the engine up before exiting
        #[arg(long, default_value_t = 3_000)]
        hold_ms: u64,
    },
    /// Check an app id against the stored rules
    Classify { app_id: String },
    /// Manage the distracting-app rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Feed a JSON-lines focus script ({"app_id", "at_ms"}) through the engine
    Replay { file: PathBuf },
    /// Print the resolved configuration and paths
    Status,
}

#[derive(Debug, Subcommand)]
enum RulesAction {
    List,
    Add {
        app_id: String,
        display_name: String,
        #[arg(long, default_value = "other")]
        category: String,
    },
    Remove { app_id: String },
}

#[derive(Debug, Deserialize)]
struct ReplayStep {
    app_id: String,
    at_ms: i64,
}

fn emit(line: &str) -> Result<(), GuardError> {
    writeln!(io::stdout().lock(), "{line}")?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<(GuardConfig, PathBuf), GuardError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    Ok((GuardConfig::load(&path)?, path))
}

fn open_database(config: &GuardConfig) -> Result<Database, GuardError> {
    Ok(Database::open_migrated(&config.resolve_database_path()?)?)
}

fn build_host(config: &GuardConfig, source: Box<dyn ForegroundSource>) -> Result<BackgroundServiceHost, GuardError> {
    let db = open_database(config)?;
    let classifier = Arc::new(Classifier::from_db(db.connection())?);
    let components = ServiceComponents::assemble(
        config,
        source,
        classifier,
        Arc::new(ConsoleRenderer),
        Arc::new(LogNavigator),
        Arc::new(LogNotifier),
    );
    Ok(BackgroundServiceHost::new(components, Arc::new(HeadlessPlatform), config))
}

fn pump_stdin(receiver: &RemoteCommandReceiver) {
    let delivered = receiver.deliver_lines(io::stdin().lock());
    info!("stdin closed after {delivered} remote commands; engine keeps running");
}

#[cfg(unix)]
fn wait_for_shutdown_signal() -> Result<(), GuardError> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        info!("Received signal {signal}, shutting down");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown_signal() -> Result<(), GuardError> {
    loop {
        thread::park();
    }
}

fn run_engine(config: &GuardConfig, read_stdin: bool) -> Result<(), GuardError> {
    let source = open_native_source(config.watch_strategy, config.poll_interval());
    let host = build_host(config, source)?;
    host.start()?;
    info!("Watching with {} strategy", host.watcher().strategy());

    if read_stdin {
        let receiver = host.receiver();
        thread::Builder::new()
            .name("remote-stdin".into())
            .spawn(move || pump_stdin(&receiver))?;
    }

    wait_for_shutdown_signal()?;
    host.stop();
    emit(&serde_json::to_string_pretty(&host.status().snapshot())?)
}

fn run_trigger(
    config: &GuardConfig,
    kind: &str,
    message: &str,
    media: Option<&str>,
    preset: Option<&str>,
    hold: Duration,
) -> Result<(), GuardError> {
    let request = match preset {
        Some(name) => trigger::preset_request(name)?,
        None => trigger::manual_request(kind, message, media, None)?,
    };
    // No native watcher for a one-off trigger; the scripted source just idles.
    let (_focus, source) = ChannelSource::new(None);
    let host = build_host(config, Box::new(source))?;

    host.start()?;
    host.request_manual_test(request)?;
    thread::sleep(hold);
    host.stop();
    Ok(())
}

fn run_classify(config: &GuardConfig, app_id: &str) -> Result<(), GuardError> {
    let db = open_database(config)?;
    let classifier = Classifier::from_db(db.connection())?;
    let result = classifier.classify(app_id);
    match result.rule {
        Some(rule) => emit(&format!("{app_id}: distracting ({}, {})", rule.display_name, rule.category.as_str())),
        None => emit(&format!("{app_id}: not distracting")),
    }
}

fn run_rules(config: &GuardConfig, action: RulesAction) -> Result<(), GuardError> {
    let db = open_database(config)?;
    let conn = db.connection();
    let classifier = Classifier::from_db(conn)?;

    match action {
        RulesAction::List => {
            for rule in rules::list_rules(conn)? {
                emit(&format!("{:<40} {:<20} {}", rule.app_id, rule.display_name, rule.category.as_str()))?;
            }
            Ok(())
        }
        RulesAction::Add { app_id, display_name, category } => {
            let rule = rules::add_rule(conn, &classifier, &app_id, &display_name, &category)?;
            emit(&format!("Added {}", rule.app_id))
        }
        RulesAction::Remove { app_id } => {
            rules::remove_rule(conn, &classifier, &app_id)?;
            emit(&format!("Removed {app_id}"))
        }
    }
}

fn read_replay(path: &Path) -> Result<Vec<ReplayStep>, GuardError> {
    let raw = std::fs::read_to_string(path)?;
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(GuardError::from))
        .collect()
}

fn run_replay(config: &GuardConfig, path: &Path) -> Result<(), GuardError> {
    let steps = read_replay(path)?;
    let (focus, source) = ChannelSource::new(config.home_app_id.clone());
    let host = build_host(config, Box::new(source))?;
    host.start()?;

    for step in steps {
        if focus.send(RawFocusEvent::new(step.app_id, step.at_ms)).is_err() {
            warn!("Watcher stopped before the script finished");
            break;
        }
    }
    drop(focus);
    host.watcher().wait();
    host.stop();
    Ok(())
}

fn run_status(config: &GuardConfig, config_path: &Path) -> Result<(), GuardError> {
    emit(&format!("config:   {}", config_path.display()))?;
    emit(&format!("database: {}", config.resolve_database_path()?.display()))?;
    emit(&serde_json::to_string_pretty(config)?)
}

fn run(cli: Cli) -> Result<(), GuardError> {
    let (config, config_path) = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run { stdin } => run_engine(&config, stdin),
        Command::Trigger { kind, message, media, preset, hold_ms } => run_trigger(
            &config,
            &kind,
            &message,
            media.as_deref(),
            preset.as_deref(),
            Duration::from_millis(hold_ms),
        ),
        Command::Classify { app_id } => run_classify(&config, &app_id),
        Command::Rules { action } => run_rules(&config, action),
        Command::Replay { file } => run_replay(&config, &file),
        Command::Status => run_status(&config, &config_path),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
