use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Please enter a video URL")]
    EmptyUrl,

    #[error("Invalid URL format")]
    InvalidUrl,

    // Server-reported messages are passed through verbatim
    #[error("{0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(String),
}
