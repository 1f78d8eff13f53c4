use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::state::ServiceKind;

/// Detail string marking the even-numbered (recovery) records in an event
/// log; every other detail is an outage reason.
pub const RECOVERY_MARKER: &str = "Recovery";

const FIELD_SEPARATOR: &str = " - ";

#[derive(Error, Debug)]
pub enum LogError {
    #[error("failed to create log file '{}': {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append to log file '{}': {source}", .path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One outage or recovery event, persisted as a single formatted line:
/// `name - service - url - timestamp - reason_or_"Recovery"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub target: String,
    pub service: String,
    pub url: String,
    pub timestamp: String,
    pub detail: String,
}

impl EventRecord {
    pub fn outage(target: &str, service: &str, url: &str, timestamp: &str, reason: &str) -> Self {
        Self {
            target: target.to_string(),
            service: service.to_string(),
            url: url.to_string(),
            timestamp: timestamp.to_string(),
            detail: reason.to_string(),
        }
    }

    pub fn recovery(target: &str, service: &str, url: &str, timestamp: &str) -> Self {
        Self {
            target: target.to_string(),
            service: service.to_string(),
            url: url.to_string(),
            timestamp: timestamp.to_string(),
            detail: RECOVERY_MARKER.to_string(),
        }
    }

    pub fn is_recovery(&self) -> bool {
        self.detail == RECOVERY_MARKER
    }

    pub fn to_line(&self) -> String {
        [
            self.target.as_str(),
            self.service.as_str(),
            self.url.as_str(),
            self.timestamp.as_str(),
            self.detail.as_str(),
        ]
        .join(FIELD_SEPARATOR)
    }

    /// Parses one persisted line. Returns `None` when the line does not
    /// carry all five fields; the caller decides how loudly to fail. The
    /// trailing field absorbs any separator occurring inside a failure
    /// reason.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(5, FIELD_SEPARATOR);
        let record = Self {
            target: fields.next()?.to_string(),
            service: fields.next()?.to_string(),
            url: fields.next()?.to_string(),
            timestamp: fields.next()?.to_string(),
            detail: fields.next()?.to_string(),
        };
        Some(record)
    }
}

/// Directory holding all channel logs of one observation window.
pub fn window_dir(root: &Path, day: u32) -> PathBuf {
    root.join(format!("day{day}"))
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect()
}

/// The two append-only files owned by a single (target, kind) channel: the
/// outage/recovery event log and the per-episode downtime log. The owning
/// channel is the only writer for the duration of the window; the report
/// aggregator reads the same paths afterwards.
#[derive(Debug, Clone)]
pub struct ChannelLog {
    events_path: PathBuf,
    downtime_path: PathBuf,
}

impl ChannelLog {
    pub fn new(root: &Path, day: u32, kind: ServiceKind, target_name: &str) -> Self {
        let dir = window_dir(root, day).join(kind.dir_name());
        let stem = file_stem(target_name);
        Self {
            events_path: dir.join(format!("events_{stem}.log")),
            downtime_path: dir.join(format!("downtime_{stem}.log")),
        }
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    pub fn downtime_path(&self) -> &Path {
        &self.downtime_path
    }

    /// Creates both files empty, truncating leftovers from an earlier run
    /// of the same window.
    pub fn create(&self) -> Result<(), LogError> {
        for path in [&self.events_path, &self.downtime_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| LogError::Create {
                    path: path.clone(),
                    source,
                })?;
            }
            File::create(path).map_err(|source| LogError::Create {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn append_event(&self, record: &EventRecord) -> Result<(), LogError> {
        append_line(&self.events_path, &record.to_line())
    }

    pub fn append_downtime(&self, secs: u64) -> Result<(), LogError> {
        append_line(&self.downtime_path, &secs.to_string())
    }
}

fn append_line(path: &Path, line: &str) -> Result<(), LogError> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|source| LogError::Append {
            path: path.to_path_buf(),
            source,
        })?;
    writeln!(file, "{line}").map_err(|source| LogError::Append {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_line_round_trip() {
        let record = EventRecord::outage(
            "Acme",
            "Consumer credit",
            "https://acme.example/credit",
            "2026-08-06 10:00:00",
            "error sending request: connection refused",
        );
        let line = record.to_line();
        assert_eq!(
            line,
            "Acme - Consumer credit - https://acme.example/credit - 2026-08-06 10:00:00 - error sending request: connection refused"
        );
        assert_eq!(EventRecord::parse(&line), Some(record));
    }

    #[test]
    fn test_recovery_marker() {
        let record = EventRecord::recovery("Acme", "Credit", "https://a", "2026-08-06 10:05:00");
        assert!(record.is_recovery());

        let parsed = EventRecord::parse(&record.to_line()).unwrap();
        assert!(parsed.is_recovery());
    }

    #[test]
    fn test_reason_may_contain_separator() {
        let record = EventRecord::outage("Acme", "Credit", "https://a", "t", "dns error - lookup failed");
        let parsed = EventRecord::parse(&record.to_line()).unwrap();
        assert_eq!(parsed.detail, "dns error - lookup failed");
    }

    #[test]
    fn test_short_line_does_not_parse() {
        assert_eq!(EventRecord::parse("Acme - Credit - https://a"), None);
    }

    #[test]
    fn test_create_truncates_and_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChannelLog::new(dir.path(), 1, ServiceKind::Primary, "Acme");

        log.create().unwrap();
        assert_eq!(fs::read_to_string(log.events_path()).unwrap(), "");

        log.append_event(&EventRecord::outage("Acme", "Credit", "u", "t1", "timeout"))
            .unwrap();
        log.append_event(&EventRecord::recovery("Acme", "Credit", "u", "t2"))
            .unwrap();
        log.append_downtime(14).unwrap();

        let events = fs::read_to_string(log.events_path()).unwrap();
        assert_eq!(events.lines().count(), 2);
        let downtime = fs::read_to_string(log.downtime_path()).unwrap();
        assert_eq!(downtime, "14\n");

        // A fresh window start wipes both files.
        log.create().unwrap();
        assert_eq!(fs::read_to_string(log.events_path()).unwrap(), "");
        assert_eq!(fs::read_to_string(log.downtime_path()).unwrap(), "");
    }

    #[test]
    fn test_append_without_create_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChannelLog::new(dir.path(), 1, ServiceKind::Secondary, "Acme");

        let result = log.append_downtime(7);
        assert!(matches!(result, Err(LogError::Append { .. })));
    }

    #[test]
    fn test_target_names_are_sanitized_for_paths() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChannelLog::new(dir.path(), 2, ServiceKind::Primary, "Acme Bank / Retail");
        log.create().unwrap();
        assert!(log.events_path().ends_with("day2/primary/events_Acme_Bank___Retail.log"));
    }
}
