use thiserror::Error;

/// Reasons a datagram cannot be turned into a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated header: need {needed} bytes, got {actual}")]
    TruncatedHeader { needed: usize, actual: usize },

    #[error("truncated payload: need {needed} bytes, got {actual}")]
    TruncatedPayload { needed: usize, actual: usize },

    #[error("packet length mismatch: header declares {declared} bytes after the primary header, datagram carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("timestamp {0}s is outside the representable calendar range")]
    TimestampOutOfRange(u64),
}

impl DecodeError {
    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::TruncatedHeader { .. } => "truncated_header",
            DecodeError::TruncatedPayload { .. } => "truncated_payload",
            DecodeError::LengthMismatch { .. } => "length_mismatch",
            DecodeError::TimestampOutOfRange(_) => "timestamp_out_of_range",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel send error")]
    ChannelSend,
}

pub type Result<T> = std::result::Result<T, Error>;
