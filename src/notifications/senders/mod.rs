use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod telegram;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("failed to read document '{}': {source}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A trait for pushing out-of-band notifications to an external channel.
/// Callers treat every send as best-effort: a failure is logged and never
/// interrupts probing or reporting.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Sends a short text message.
    async fn notify(&self, message: &str) -> Result<(), SenderError>;

    /// Delivers a file (e.g. the daily report) with a caption.
    async fn deliver(&self, file: &Path, caption: &str) -> Result<(), SenderError>;
}
