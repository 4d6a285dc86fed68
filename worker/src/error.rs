use anchor_queue::QueueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// `initialize` was called a second time on the same instance.
    #[error("the worker is already initialized")]
    AlreadyInitialized,

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("config error: {0}")]
    Config(String),
}
