use std::time::Duration;

use crate::config::Target;

/// Downtime charged for every failed probe while a channel is Degraded.
pub const FAILURE_COST_SECS: u64 = 7;

const HEALTHY_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEGRADED_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Which of a target's two endpoints a channel observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Primary,
    Secondary,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Primary, ServiceKind::Secondary];

    /// Log subdirectory for this endpoint kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            ServiceKind::Primary => "primary",
            ServiceKind::Secondary => "secondary",
        }
    }

    pub fn url_of(self, target: &Target) -> &str {
        match self {
            ServiceKind::Primary => &target.primary_url,
            ServiceKind::Secondary => &target.secondary_url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelHealth {
    Healthy,
    /// Observing failures since the last success.
    Degraded,
}

/// What a single probe outcome did to the channel, and therefore which
/// side effects (notification, event record, downtime record) are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Healthy probe on a healthy channel; nothing to record.
    Steady,
    /// First failure since the channel was last Healthy. The only failure
    /// in an episode that triggers a notification and an event record.
    OutageStarted,
    /// A further failure inside an ongoing episode; downtime keeps
    /// accumulating but nothing is emitted.
    StillDown,
    /// Success after one or more failures. Carries the downtime to flush.
    Recovered { downtime_secs: u64 },
}

/// The per-channel availability state machine.
///
/// Invariant: `downtime_secs == FAILURE_COST_SECS * failures` at every
/// instant between `observe` calls, until a recovery resets both.
#[derive(Debug, Clone, Copy)]
pub struct ChannelState {
    health: ChannelHealth,
    downtime_secs: u64,
    failures: u32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            health: ChannelHealth::Healthy,
            downtime_secs: 0,
            failures: 0,
        }
    }

    pub fn health(&self) -> ChannelHealth {
        self.health
    }

    pub fn downtime_secs(&self) -> u64 {
        self.downtime_secs
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Feeds one probe outcome into the state machine and reports the
    /// transition the caller must act on.
    pub fn observe(&mut self, ok: bool) -> Transition {
        if ok {
            match self.health {
                ChannelHealth::Healthy => Transition::Steady,
                ChannelHealth::Degraded => {
                    let downtime_secs = self.downtime_secs;
                    self.health = ChannelHealth::Healthy;
                    self.failures = 0;
                    self.downtime_secs = 0;
                    Transition::Recovered { downtime_secs }
                }
            }
        } else {
            self.health = ChannelHealth::Degraded;
            self.failures += 1;
            self.downtime_secs += FAILURE_COST_SECS;
            if self.failures == 1 {
                Transition::OutageStarted
            } else {
                Transition::StillDown
            }
        }
    }

    /// Polling cadence for the current health state.
    pub fn poll_interval(&self) -> Duration {
        match self.health {
            ChannelHealth::Healthy => HEALTHY_POLL_INTERVAL,
            ChannelHealth::Degraded => DEGRADED_POLL_INTERVAL,
        }
    }

    /// Closes the window. If the channel is still Degraded, returns the
    /// accumulated downtime of the open episode so the caller can flush it
    /// rather than lose it.
    pub fn close(self) -> Option<u64> {
        match self.health {
            ChannelHealth::Healthy => None,
            ChannelHealth::Degraded => Some(self.downtime_secs),
        }
    }
}
