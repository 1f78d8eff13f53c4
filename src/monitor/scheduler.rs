use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::notifications::senders::NotificationSender;

use super::channel::{ChannelError, ProbeChannel};
use super::event_log::{ChannelLog, LogError};
use super::state::ServiceKind;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("probe task for '{target}' ({kind}) panicked")]
    TaskPanicked { target: String, kind: &'static str },
}

/// Runs one full observation window: creates every channel's log files,
/// spawns one independent probe task per (target, endpoint-kind) pair with
/// a shared window start, and waits for all of them to finish.
///
/// Individual probe failures never surface here; the only error a channel
/// can return is a persistence failure, and the first one observed is
/// propagated after every task has been joined.
pub async fn run_window(
    config: &MonitorConfig,
    sender: Arc<dyn NotificationSender>,
    log_root: &Path,
    day: u32,
    window: Duration,
) -> Result<(), SchedulerError> {
    // All log files exist empty before the first probe fires.
    for target in &config.targets {
        for kind in ServiceKind::ALL {
            ChannelLog::new(log_root, day, kind, &target.name).create()?;
        }
    }

    let window_start = Instant::now();
    let mut labels = Vec::new();
    let mut tasks = Vec::new();
    for target in &config.targets {
        for kind in ServiceKind::ALL {
            let log = ChannelLog::new(log_root, day, kind, &target.name);
            let channel = ProbeChannel::new(target.clone(), kind, log, sender.clone())?;
            labels.push((target.name.clone(), kind));
            tasks.push(tokio::spawn(channel.run(window_start, window)));
        }
    }
    info!(channels = tasks.len(), day, window_secs = window.as_secs(), "observation window started");

    let results = join_all(tasks).await;
    info!(day, "observation window closed");

    let mut first_error: Option<SchedulerError> = None;
    for ((target, kind), result) in labels.into_iter().zip(results) {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(name = %target, kind = kind.dir_name(), error = %e, "probe channel failed");
                if first_error.is_none() {
                    first_error = Some(e.into());
                }
            }
            Err(join_error) => {
                error!(name = %target, kind = kind.dir_name(), error = ?join_error, "probe task panicked");
                if first_error.is_none() {
                    first_error = Some(SchedulerError::TaskPanicked {
                        target,
                        kind: kind.dir_name(),
                    });
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Target, TelegramConfig};
    use crate::notifications::senders::SenderError;
    use async_trait::async_trait;

    struct NullSender;

    #[async_trait]
    impl NotificationSender for NullSender {
        async fn notify(&self, _message: &str) -> Result<(), SenderError> {
            Ok(())
        }

        async fn deliver(&self, _file: &Path, _caption: &str) -> Result<(), SenderError> {
            Ok(())
        }
    }

    fn config_with_targets(targets: Vec<Target>) -> MonitorConfig {
        MonitorConfig {
            telegram: TelegramConfig {
                bot_token: "t".to_string(),
                chat_id: "c".to_string(),
            },
            targets,
        }
    }

    #[tokio::test]
    async fn test_zero_window_creates_all_channel_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_targets(vec![
            Target {
                name: "Acme".to_string(),
                service: "Credit".to_string(),
                primary_url: "https://acme.invalid/".to_string(),
                secondary_url: "https://id.acme.invalid/".to_string(),
            },
            Target {
                name: "Globex".to_string(),
                service: "Travel".to_string(),
                primary_url: "https://globex.invalid/".to_string(),
                secondary_url: "https://cabinet.globex.invalid/".to_string(),
            },
        ]);

        // A zero-length window closes every channel before its first probe.
        run_window(&config, Arc::new(NullSender), dir.path(), 1, Duration::ZERO)
            .await
            .unwrap();

        for target in &config.targets {
            for kind in ServiceKind::ALL {
                let log = ChannelLog::new(dir.path(), 1, kind, &target.name);
                assert_eq!(std::fs::read_to_string(log.events_path()).unwrap(), "");
                assert_eq!(std::fs::read_to_string(log.downtime_path()).unwrap(), "");
            }
        }
    }

    #[tokio::test]
    async fn test_unwritable_log_root_is_fatal() {
        let config = config_with_targets(vec![Target {
            name: "Acme".to_string(),
            service: "Credit".to_string(),
            primary_url: "https://acme.invalid/".to_string(),
            secondary_url: "https://id.acme.invalid/".to_string(),
        }]);

        let result = run_window(
            &config,
            Arc::new(NullSender),
            Path::new("/dev/null/not-a-directory"),
            1,
            Duration::ZERO,
        )
        .await;
        assert!(matches!(result, Err(SchedulerError::Log(LogError::Create { .. }))));
    }
}
