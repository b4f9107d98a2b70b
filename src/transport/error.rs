use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid header length: {0}")]
    InvalidHeaderLength(i32),

    #[error("declared body length out of range: {0}")]
    InvalidBodyLength(i64),

    #[error("malformed header JSON: {0}")]
    MalformedHeader(#[from] serde_json::Error),

    #[error("stream ended mid-frame")]
    Truncated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
