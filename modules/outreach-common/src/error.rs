use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngageError {
    #[error("pipeline is already running")]
    AlreadyRunning,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("state store error: {0}")]
    Store(String),

    #[error("hand-off queue is closed")]
    QueueClosed,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
