pub mod channel;
pub mod event_log;
pub mod scheduler;
pub mod state;

/// Length of one observation window. Probing stops and the daily report is
/// generated once this much time has elapsed since the window start.
pub const OBSERVATION_WINDOW_SECS: u64 = 86_400;
