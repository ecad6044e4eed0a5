use std::time::Duration;

/// Core error type for tgcopy.
///
/// Adapter crates map their platform errors into this type so the pipeline can tell a
/// flood-wait (retryable) from an unavailable entity or a generic RPC failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing keys in config file: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited, retry after {seconds}s")]
    FloodWait { seconds: u64 },

    #[error("entity invalid or private: {0}")]
    EntityUnavailable(String),

    #[error("{role} channel not found: {identifier}")]
    ChannelNotFound { role: String, identifier: String },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Wait requested by the platform, if this is a flood-wait signal.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::FloodWait { seconds } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
