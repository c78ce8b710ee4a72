//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell as CompletionShell};
use colored::{control, Colorize};
use serde_json::json;
use thiserror::Error;

use drive_dash::alert::{drive_of_alert_id, AlertEngine, DismissalLedger, ThresholdStore};
use drive_dash::core::config::{Config, StoreBackend};
use drive_dash::core::errors::DdsError;
use drive_dash::format::format_bytes;
use drive_dash::notify::{FileChannelConfig, NotifyConfig, NotifyEvent, NotifyManager};
use drive_dash::platform::detect_backend;
use drive_dash::store::file::JsonFileStore;
#[cfg(feature = "sqlite")]
use drive_dash::store::sqlite::SqliteStore;
use drive_dash::store::SharedStore;

/// Drive Dash — usage alerts and move navigation for local drives.
#[derive(Debug, Parser)]
#[command(
    name = "ddash",
    author,
    version,
    about = "Drive Dash - Storage Dashboard Core",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List drives with current usage.
    Drives(DrivesArgs),
    /// Poll drives on an interval and raise threshold alerts.
    Watch(WatchArgs),
    /// Show or set per-drive alert thresholds.
    Thresholds(ThresholdsArgs),
    /// Dismiss an alert until its drive recovers.
    Dismiss(DismissArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct DrivesArgs {}

#[derive(Debug, Clone, Args, Default)]
struct WatchArgs {
    /// Override the poll interval in seconds.
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,
    /// Stop after this many polls (0 = run until signalled).
    #[arg(long, default_value_t = 0, value_name = "COUNT")]
    polls: u64,
    /// Disable notification channels for this run.
    #[arg(long)]
    no_notify: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ThresholdsArgs {
    /// Set the threshold for one drive, as `DRIVE=PERCENT`.
    #[arg(long, value_name = "DRIVE=PERCENT")]
    set: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct DismissArgs {
    /// The alert id to dismiss, as printed by `watch` (e.g. `C-82.0`).
    #[arg(value_name = "ALERT_ID")]
    alert_id: String,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) | Self::Json(_) => 2,
        }
    }
}

impl From<DdsError> for CliError {
    fn from(value: DdsError) -> Self {
        match value {
            DdsError::InvalidThreshold { .. } | DdsError::Precondition { .. } => {
                Self::User(value.to_string())
            }
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Drives(args) => run_drives(cli, args),
        Command::Watch(args) => run_watch(cli, args),
        Command::Thresholds(args) => run_thresholds(cli, args),
        Command::Dismiss(args) => run_dismiss(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(Config::load(cli.config.as_deref())?)
}

fn open_store(config: &Config) -> Result<SharedStore, CliError> {
    match config.store.backend {
        StoreBackend::File => Ok(Arc::new(JsonFileStore::open(&config.paths.store_dir)?)),
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.paths.sqlite_db)?)),
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => Err(CliError::User(
            "store.backend = \"sqlite\" needs a build with the sqlite feature".to_string(),
        )),
    }
}

/// Notification channels for long-running commands, with the JSONL log
/// directed at the configured path.
fn notify_config_for(config: &Config) -> NotifyConfig {
    NotifyConfig {
        file: FileChannelConfig {
            path: config.paths.jsonl_log.clone(),
        },
        ..NotifyConfig::default()
    }
}

// ──────────────────── drives ────────────────────

fn run_drives(cli: &Cli, _args: &DrivesArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = detect_backend()?;
    let drives = backend.list_drives()?;

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({ "drives": drives });
            writeln!(io::stdout(), "{}", serde_json::to_string_pretty(&payload)?)?;
        }
        OutputMode::Human => {
            let store = open_store(&config)?;
            let thresholds =
                ThresholdStore::load(store, config.alerts.default_threshold_pct)?;
            for drive in &drives {
                let threshold = thresholds.get(&drive.id);
                let usage = format!("{:.1}%", drive.usage_percentage);
                let usage = if drive.usage_percentage >= threshold {
                    usage.red().bold()
                } else if drive.usage_percentage >= threshold - config.alerts.hysteresis_pct {
                    usage.yellow()
                } else {
                    usage.green()
                };
                println!(
                    "{:<16} {:>8}  {:>10} free of {:>10}  (alert at {threshold:.0}%)",
                    drive.id,
                    usage,
                    format_bytes(drive.free_space),
                    format_bytes(drive.total_size),
                );
            }
        }
    }
    Ok(())
}

// ──────────────────── watch ────────────────────

fn run_watch(cli: &Cli, args: &WatchArgs) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(interval) = args.interval {
        config.alerts.poll_interval_secs = interval;
        config.validate()?;
    }
    let backend = detect_backend()?;
    let store = open_store(&config)?;
    let thresholds = ThresholdStore::load(store.clone(), config.alerts.default_threshold_pct)?;
    let dismissals = DismissalLedger::load(store)?;
    let mut engine = AlertEngine::new(thresholds, dismissals, config.alerts.hysteresis_pct);

    let mut notifier = if args.no_notify {
        NotifyManager::disabled()
    } else {
        NotifyManager::from_config(&notify_config_for(&config))
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&shutdown)) {
            eprintln!("[DDS-SIGNAL] failed to register signal {signal}: {e}");
        }
    }

    let started = Instant::now();
    notifier.notify(&NotifyEvent::WatcherStarted {
        version: env!("CARGO_PKG_VERSION").to_string(),
        interval_secs: config.alerts.poll_interval_secs,
    });

    let mut polls_done: u64 = 0;
    while !shutdown.load(Ordering::Relaxed) {
        match engine.poll(backend.as_ref(), chrono::Utc::now()) {
            Ok(report) => {
                if report.pruned_dismissals > 0 {
                    notifier.notify(&NotifyEvent::DismissalsPruned {
                        count: report.pruned_dismissals,
                    });
                }
                for raised in &report.raised {
                    let Some(alert) = engine.active().iter().find(|a| &a.id == raised) else {
                        continue;
                    };
                    notifier.notify(&NotifyEvent::AlertRaised {
                        alert_id: alert.id.clone(),
                        drive: alert.drive_id.clone(),
                        usage_pct: alert.usage_percentage,
                        severity: alert.severity,
                    });
                    print_alert(cli, alert)?;
                }
            }
            Err(err) => {
                // Transient by contract: the next tick retries with no
                // backoff and the engine state is untouched.
                notifier.notify(&NotifyEvent::PollFailed {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
            }
        }

        polls_done += 1;
        if args.polls > 0 && polls_done >= args.polls {
            break;
        }
        sleep_until_next_tick(&shutdown, config.alerts.poll_interval());
    }

    notifier.notify(&NotifyEvent::WatcherStopped {
        reason: if shutdown.load(Ordering::Relaxed) {
            "signal".to_string()
        } else {
            "poll budget reached".to_string()
        },
        uptime_secs: started.elapsed().as_secs(),
    });
    Ok(())
}

/// Sleep in short slices so a shutdown signal interrupts the wait promptly.
fn sleep_until_next_tick(shutdown: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while Instant::now() < deadline && !shutdown.load(Ordering::Relaxed) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        std::thread::sleep(remaining.min(Duration::from_millis(200)));
    }
}

fn print_alert(cli: &Cli, alert: &drive_dash::alert::Alert) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Json => {
            writeln!(io::stdout(), "{}", serde_json::to_string(alert)?)?;
        }
        OutputMode::Human => {
            let tag = match alert.severity {
                drive_dash::alert::Severity::Critical => "CRITICAL".red().bold(),
                drive_dash::alert::Severity::Warning => "WARNING".yellow().bold(),
            };
            println!(
                "{tag} {} at {:.1}% (threshold {:.0}%)",
                alert.drive_name, alert.usage_percentage, alert.threshold
            );
        }
    }
    Ok(())
}

// ──────────────────── dismiss ────────────────────

fn run_dismiss(cli: &Cli, args: &DismissArgs) -> Result<(), CliError> {
    if drive_of_alert_id(&args.alert_id).is_none() {
        return Err(CliError::User(format!(
            "expected an alert id like C-82.0, got {:?}",
            args.alert_id
        )));
    }
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let mut dismissals = DismissalLedger::load(store)?;

    let newly_dismissed = !dismissals.is_dismissed(&args.alert_id);
    dismissals.dismiss(&args.alert_id)?;
    if newly_dismissed {
        let mut notifier = NotifyManager::from_config(&notify_config_for(&config));
        notifier.notify(&NotifyEvent::AlertDismissed {
            alert_id: args.alert_id.clone(),
        });
    }

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "dismissed": args.alert_id,
                "already_dismissed": !newly_dismissed,
            });
            writeln!(io::stdout(), "{}", serde_json::to_string_pretty(&payload)?)?;
        }
        OutputMode::Human => {
            if newly_dismissed {
                println!("dismissed {}", args.alert_id);
            } else {
                println!("{} was already dismissed", args.alert_id);
            }
        }
    }
    Ok(())
}

// ──────────────────── thresholds ────────────────────

fn run_thresholds(cli: &Cli, args: &ThresholdsArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = open_store(&config)?;
    let mut thresholds = ThresholdStore::load(store, config.alerts.default_threshold_pct)?;

    if !args.set.is_empty() {
        let mut draft = thresholds.draft();
        for assignment in &args.set {
            let Some((drive, raw)) = assignment.split_once('=') else {
                return Err(CliError::User(format!(
                    "expected DRIVE=PERCENT, got {assignment:?}"
                )));
            };
            let value: f64 = raw
                .parse()
                .map_err(|_| CliError::User(format!("not a percentage: {raw:?}")))?;
            draft.stage(drive, value);
        }
        thresholds.commit(draft)?;
    }

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({ "thresholds": thresholds.entries() });
            writeln!(io::stdout(), "{}", serde_json::to_string_pretty(&payload)?)?;
        }
        OutputMode::Human => {
            if thresholds.entries().is_empty() {
                println!(
                    "no stored thresholds (default {:.0}%)",
                    config.alerts.default_threshold_pct
                );
            }
            for (drive, value) in thresholds.entries() {
                println!("{drive:<16} {value:>6.1}%");
            }
        }
    }
    Ok(())
}
