use std::io;
use std::time::Duration;

/// Everything that can go wrong while handling a single client query
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// Malformed header, question or answer section, truncated buffer,
    /// bad label length or a bad compression pointer
    #[error("format error: {0}")]
    Format(String),

    /// The upstream resolver did not answer within the deadline
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// Socket-level send/receive failure
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl DnsError {
    pub fn format(msg: impl Into<String>) -> Self {
        DnsError::Format(msg.into())
    }
}
