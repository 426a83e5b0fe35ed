//! Error types for the live-feed client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("broker error: {0}")]
    Broker(String),

    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("publish dropped: session is not connected")]
    PublishDropped,

    #[error("session worker is gone")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, FeedError>;
