use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::Target;
use crate::monitor::event_log::{ChannelLog, EventRecord};
use crate::monitor::state::ServiceKind;

/// Timeline sentinel for a channel whose event log is empty.
pub const NO_OUTAGES: &str = "-";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("missing log file '{}'", .path.display())]
    MissingLog { path: PathBuf },
    #[error("failed to read log file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed event record at {}:{line}", .path.display())]
    MalformedEvent { path: PathBuf, line: usize },
    #[error("malformed downtime record at {}:{line}", .path.display())]
    MalformedDowntime { path: PathBuf, line: usize },
    #[error("event records do not alternate outage/recovery at {}:{line}", .path.display())]
    BrokenAlternation { path: PathBuf, line: usize },
    #[error("failed to write report '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One report row per target, covering both of its channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub target: String,
    pub primary_uptime: f64,
    pub secondary_uptime: f64,
    pub primary_timeline: String,
    pub secondary_timeline: String,
    pub total_downtime_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub day: u32,
    pub rows: Vec<ReportRow>,
}

impl DailyReport {
    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "Target,Primary uptime %,Secondary uptime %,Primary outages,Secondary outages,Total downtime (s)\n",
        );
        for row in &self.rows {
            out.push_str(&format!(
                "{},{:.2},{:.2},{},{},{}\n",
                csv_field(&row.target),
                row.primary_uptime,
                row.secondary_uptime,
                csv_field(&row.primary_timeline),
                csv_field(&row.secondary_timeline),
                row.total_downtime_secs,
            ));
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.to_csv()).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

struct ChannelSummary {
    uptime: f64,
    timeline: String,
    downtime_secs: u64,
}

/// Builds the daily report from the completed log directory of `day`.
/// Runs strictly after every probe channel has finished; reads only, so
/// rebuilding over the same directory yields identical rows.
pub fn build_report(
    targets: &[Target],
    log_root: &Path,
    day: u32,
    window_secs: u64,
) -> Result<DailyReport, ReportError> {
    let mut rows = Vec::with_capacity(targets.len());
    for target in targets {
        let primary = summarize_channel(target, ServiceKind::Primary, log_root, day, window_secs)?;
        let secondary =
            summarize_channel(target, ServiceKind::Secondary, log_root, day, window_secs)?;
        rows.push(ReportRow {
            target: target.name.clone(),
            primary_uptime: primary.uptime,
            secondary_uptime: secondary.uptime,
            primary_timeline: primary.timeline,
            secondary_timeline: secondary.timeline,
            total_downtime_secs: primary.downtime_secs + secondary.downtime_secs,
        });
    }
    info!(day, rows = rows.len(), "daily report built");
    Ok(DailyReport { day, rows })
}

fn summarize_channel(
    target: &Target,
    kind: ServiceKind,
    log_root: &Path,
    day: u32,
    window_secs: u64,
) -> Result<ChannelSummary, ReportError> {
    let log = ChannelLog::new(log_root, day, kind, &target.name);
    let downtime = read_downtime(log.downtime_path())?;
    let events = read_events(log.events_path())?;
    Ok(ChannelSummary {
        uptime: uptime_percent(window_secs, &downtime),
        timeline: outage_timeline(&target.service, &events),
        downtime_secs: downtime.iter().sum(),
    })
}

/// Uptime over the window given the recorded per-episode downtime, rounded
/// to two decimals and clamped to [0, 100]. An empty downtime log means a
/// fully available channel.
fn uptime_percent(window_secs: u64, downtime: &[u64]) -> f64 {
    if downtime.is_empty() {
        return 100.0;
    }
    let total: u64 = downtime.iter().sum();
    let raw = (window_secs as f64 - total as f64) / window_secs as f64 * 100.0;
    ((raw * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

/// Rebuilds a channel's outage timeline from its event log. Records
/// alternate outage/recovery; a trailing unmatched outage means the window
/// closed mid-episode and is labelled as ongoing rather than dropped.
fn outage_timeline(service: &str, events: &[EventRecord]) -> String {
    if events.is_empty() {
        return NO_OUTAGES.to_string();
    }
    let mut parts = Vec::with_capacity(events.len() + 1);
    parts.push(service.to_string());
    for (idx, event) in events.iter().enumerate() {
        if idx % 2 == 0 {
            parts.push(format!("{} service outage", event.timestamp));
        } else {
            parts.push(format!("{} service recovery", event.timestamp));
        }
    }
    if events.len() % 2 == 1 {
        if let Some(last) = parts.last_mut() {
            last.push_str(" (ongoing at window close)");
        }
    }
    parts.join(" - ")
}

fn read_lines(path: &Path) -> Result<Vec<String>, ReportError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ReportError::MissingLog {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ReportError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_downtime(path: &Path) -> Result<Vec<u64>, ReportError> {
    let mut records = Vec::new();
    for (idx, line) in read_lines(path)?.into_iter().enumerate() {
        let secs = line
            .trim()
            .parse::<u64>()
            .map_err(|_| ReportError::MalformedDowntime {
                path: path.to_path_buf(),
                line: idx + 1,
            })?;
        records.push(secs);
    }
    Ok(records)
}

/// Reads and validates a channel's event log: every record must carry all
/// five fields, and outage/recovery records must strictly alternate
/// starting with an outage.
fn read_events(path: &Path) -> Result<Vec<EventRecord>, ReportError> {
    let mut records = Vec::new();
    for (idx, line) in read_lines(path)?.into_iter().enumerate() {
        let record = EventRecord::parse(&line).ok_or_else(|| ReportError::MalformedEvent {
            path: path.to_path_buf(),
            line: idx + 1,
        })?;
        let expect_recovery = idx % 2 == 1;
        if record.is_recovery() != expect_recovery {
            return Err(ReportError::BrokenAlternation {
                path: path.to_path_buf(),
                line: idx + 1,
            });
        }
        records.push(record);
    }
    Ok(records)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
