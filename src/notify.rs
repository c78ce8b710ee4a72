//! Notification dispatch for the watch loop: journal and file channels.
//!
//! Events are dispatched through configured channels with min-level
//! filtering. Each channel is fire-and-forget; a channel failure never
//! blocks or fails the poll loop.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::alert::Severity;

// ──────────────────── notification level ────────────────────

/// Severity level for notification filtering. Alert severities map onto it
/// but it is a separate type since events can originate outside the alert
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Critical,
}

impl NotifyLevel {
    /// Convert from an alert severity.
    #[must_use]
    pub const fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Warning => Self::Warning,
            Severity::Critical => Self::Critical,
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

// ──────────────────── notification events ────────────────────

/// A structured notification event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    AlertRaised {
        alert_id: String,
        drive: String,
        usage_pct: f64,
        severity: Severity,
    },
    AlertDismissed {
        alert_id: String,
    },
    DismissalsPruned {
        count: usize,
    },
    PollFailed {
        code: String,
        message: String,
    },
    WatcherStarted {
        version: String,
        interval_secs: u64,
    },
    WatcherStopped {
        reason: String,
        uptime_secs: u64,
    },
}

impl NotifyEvent {
    /// The severity level of this event (for min-level filtering).
    #[must_use]
    pub fn level(&self) -> NotifyLevel {
        match self {
            Self::AlertRaised { severity, .. } => NotifyLevel::from_severity(*severity),
            Self::PollFailed { .. } => NotifyLevel::Warning,
            Self::AlertDismissed { .. }
            | Self::DismissalsPruned { .. }
            | Self::WatcherStarted { .. }
            | Self::WatcherStopped { .. } => NotifyLevel::Info,
        }
    }

    /// Short human-readable summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::AlertRaised {
                drive,
                usage_pct,
                severity,
                ..
            } => format!("{severity} alert on {drive}: {usage_pct:.1}% used"),
            Self::AlertDismissed { alert_id } => format!("Alert {alert_id} dismissed"),
            Self::DismissalsPruned { count } => {
                format!("Pruned {count} dismissals for recovered drives")
            }
            Self::PollFailed { code, message } => format!("[{code}] poll failed: {message}"),
            Self::WatcherStarted {
                version,
                interval_secs,
            } => format!("ddash v{version} watching drives every {interval_secs}s"),
            Self::WatcherStopped {
                reason,
                uptime_secs,
            } => {
                let hours = uptime_secs / 3600;
                let minutes = (uptime_secs % 3600) / 60;
                format!("ddash stopped ({reason}) after {hours}h {minutes}m")
            }
        }
    }
}

// ──────────────────── configuration ────────────────────

/// Top-level notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotifyConfig {
    /// Master switch for all notifications.
    pub enabled: bool,
    /// Which channel names to activate.
    pub channels: Vec<String>,
    pub file: FileChannelConfig,
    pub journal: JournalChannelConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: vec!["journal".to_string(), "file".to_string()],
            file: FileChannelConfig::default(),
            journal: JournalChannelConfig::default(),
        }
    }
}

/// File channel settings (append-only JSONL).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileChannelConfig {
    pub path: PathBuf,
}

impl Default for FileChannelConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        Self {
            path: home
                .join(".local")
                .join("share")
                .join("ddash")
                .join("notifications.jsonl"),
        }
    }
}

/// Journal channel settings (stderr, picked up by systemd when present).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalChannelConfig {
    pub min_level: NotifyLevel,
}

impl Default for JournalChannelConfig {
    fn default() -> Self {
        Self {
            min_level: NotifyLevel::Warning,
        }
    }
}

// ──────────────────── JSONL record ────────────────────

/// A single notification record written to the JSONL file.
#[derive(Debug, Serialize)]
struct NotifyRecord {
    ts: String,
    level: NotifyLevel,
    summary: String,
    #[serde(flatten)]
    event: NotifyEvent,
}

// ──────────────────── channels ────────────────────

/// A notification channel that can dispatch events.
trait Channel: Send + Sync {
    fn name(&self) -> &'static str;
    fn send(&self, event: &NotifyEvent);
}

struct FileChannel {
    path: PathBuf,
}

impl FileChannel {
    fn new(config: &FileChannelConfig) -> Self {
        Self {
            path: config.path.clone(),
        }
    }
}

impl Channel for FileChannel {
    fn name(&self) -> &'static str {
        "file"
    }

    fn send(&self, event: &NotifyEvent) {
        let record = NotifyRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level: event.level(),
            summary: event.summary(),
            event: event.clone(),
        };
        let Ok(json) = serde_json::to_string(&record) else {
            return;
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let file = {
            let mut opts = OpenOptions::new();
            opts.create(true).append(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o600);
            }
            opts.open(&self.path)
        };
        if let Ok(mut f) = file {
            let _ = writeln!(f, "{json}");
        }
    }
}

struct JournalChannel {
    min_level: NotifyLevel,
}

impl JournalChannel {
    const fn new(config: &JournalChannelConfig) -> Self {
        Self {
            min_level: config.min_level,
        }
    }
}

impl Channel for JournalChannel {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn send(&self, event: &NotifyEvent) {
        if event.level() < self.min_level {
            return;
        }
        let priority = match event.level() {
            NotifyLevel::Critical => "CRIT",
            NotifyLevel::Warning => "WARNING",
            NotifyLevel::Info => "INFO",
        };
        eprintln!("[DDS-NOTIFY] [{priority}] {}", event.summary());
    }
}

// ──────────────────── manager ────────────────────

/// Coordinates dispatching events to all enabled channels.
///
/// Cheap to call from the poll loop; channel failures never propagate.
pub struct NotifyManager {
    channels: Vec<Box<dyn Channel>>,
    enabled: bool,
    last_send: Option<Instant>,
}

impl NotifyManager {
    /// Build a manager from configuration.
    #[must_use]
    pub fn from_config(config: &NotifyConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let mut channels: Vec<Box<dyn Channel>> = Vec::new();
        for channel_name in &config.channels {
            match channel_name.as_str() {
                "file" => channels.push(Box::new(FileChannel::new(&config.file))),
                "journal" => channels.push(Box::new(JournalChannel::new(&config.journal))),
                _ => {
                    // Unknown channel name, skip silently.
                }
            }
        }
        Self {
            channels,
            enabled: true,
            last_send: None,
        }
    }

    /// Create a disabled (no-op) manager.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            channels: Vec::new(),
            enabled: false,
            last_send: None,
        }
    }

    /// Dispatch an event to all enabled channels.
    pub fn notify(&mut self, event: &NotifyEvent) {
        if !self.enabled {
            return;
        }
        self.last_send = Some(Instant::now());
        for channel in &self.channels {
            channel.send(event);
        }
    }

    /// Number of active channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// When the last event was dispatched, if any.
    #[must_use]
    pub const fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    /// Whether the manager is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// List the names of active channels.
    #[must_use]
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

// ──────────────────── tests ────────────────────
