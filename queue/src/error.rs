use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),
}
