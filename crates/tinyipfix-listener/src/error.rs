//! Error types for the listener.

use tinyipfix_core::DecodeError;

/// Failures turning bridge output into frames.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("dump line too short: {0:?}")]
    ShortDumpLine(String),
    #[error("invalid hex dump: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("datagram of {len} bytes carries no payload after its {header} byte IPv6/UDP header")]
    NoPayload { len: usize, header: usize },
}

/// Errors that can occur while running the listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}
