use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized: token rejected by backend")]
    Unauthorized,
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("watch channel send failed")]
    WatchSend,
    #[error("state lock poisoned")]
    StateLock,
}
