use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("messaging service rejected the message: {0}")]
    Rejected(String),
    #[error("messaging service unreachable: {0}")]
    Unreachable(String),
}

/// Posts plain text into a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: &str, text: &str) -> Result<(), NotifyError>;
}

#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _channel_id: &str, _text: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
