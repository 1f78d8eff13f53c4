use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Target;
use crate::notifications::senders::NotificationSender;

use super::event_log::{ChannelLog, EventRecord, LogError};
use super::state::{ChannelState, ServiceKind, Transition};

/// Per-probe request timeout. Anything slower counts as a transport
/// failure.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result of one probe. Any HTTP response counts as reachable regardless
/// of status code; only transport-level errors (timeout, DNS, refused
/// connection) count as failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Up(u16),
    Down(String),
}

/// One (target, endpoint-kind) probe loop: repeatedly checks a single URL
/// for the duration of the observation window, feeding outcomes through
/// the availability state machine and persisting its transitions.
pub struct ProbeChannel {
    target: Target,
    kind: ServiceKind,
    url: String,
    client: Client,
    log: ChannelLog,
    sender: Arc<dyn NotificationSender>,
    state: ChannelState,
}

impl ProbeChannel {
    pub fn new(
        target: Target,
        kind: ServiceKind,
        log: ChannelLog,
        sender: Arc<dyn NotificationSender>,
    ) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        let url = kind.url_of(&target).to_string();
        Ok(Self {
            target,
            kind,
            url,
            client,
            log,
            sender,
            state: ChannelState::new(),
        })
    }

    /// Probes until `window` has elapsed since `window_start`, then closes
    /// the channel. Only persistence failures abort the loop; transport
    /// errors are ordinary state-machine input.
    pub async fn run(mut self, window_start: Instant, window: Duration) -> Result<(), ChannelError> {
        info!(name = %self.target.name, kind = self.kind.dir_name(), url = %self.url, "probe channel started");
        loop {
            if window_start.elapsed() >= window {
                break;
            }
            let outcome = self.probe().await;
            let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
            self.apply(outcome, &now).await?;
            tokio::time::sleep(self.state.poll_interval()).await;
        }
        self.finish()
    }

    async fn probe(&self) -> ProbeOutcome {
        match self.client.get(&self.url).send().await {
            Ok(response) => ProbeOutcome::Up(response.status().as_u16()),
            Err(e) => ProbeOutcome::Down(e.to_string()),
        }
    }

    /// Applies one probe outcome: updates the state machine and performs
    /// the side effects its transition demands. The event line doubles as
    /// the notification text.
    async fn apply(&mut self, outcome: ProbeOutcome, timestamp: &str) -> Result<(), ChannelError> {
        match outcome {
            ProbeOutcome::Up(status) => {
                info!(url = %self.url, status, timestamp, "probe ok");
                if let Transition::Recovered { downtime_secs } = self.state.observe(true) {
                    let record = EventRecord::recovery(
                        &self.target.name,
                        &self.target.service,
                        &self.url,
                        timestamp,
                    );
                    self.notify_best_effort(&record.to_line()).await;
                    self.log.append_event(&record)?;
                    self.log.append_downtime(downtime_secs)?;
                }
            }
            ProbeOutcome::Down(reason) => {
                info!(url = %self.url, reason = %reason, timestamp, "probe failed");
                if self.state.observe(false) == Transition::OutageStarted {
                    let record = EventRecord::outage(
                        &self.target.name,
                        &self.target.service,
                        &self.url,
                        timestamp,
                        &reason,
                    );
                    self.notify_best_effort(&record.to_line()).await;
                    self.log.append_event(&record)?;
                }
            }
        }
        Ok(())
    }

    /// Window close. An episode still open at this point has its downtime
    /// flushed; no recovery event is written, which the aggregator renders
    /// as an ongoing outage.
    fn finish(self) -> Result<(), ChannelError> {
        if let Some(downtime_secs) = self.state.close() {
            info!(
                name = %self.target.name,
                kind = self.kind.dir_name(),
                downtime_secs,
                "window closed mid-outage, flushing downtime"
            );
            self.log.append_downtime(downtime_secs)?;
        }
        Ok(())
    }

    async fn notify_best_effort(&self, message: &str) {
        if let Err(e) = self.sender.notify(message).await {
            warn!(url = %self.url, error = %e, "notification failed");
        }
    }
}
