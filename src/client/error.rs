use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("server closed the connection unexpectedly")]
    ConnectionClosed,

    #[error("expected {expected} reply, got {got}")]
    UnexpectedReply { expected: &'static str, got: String },

    #[error("server rejected request: {0}")]
    Rejected(String),

    #[error("invalid reply payload: {0}")]
    Payload(#[from] crate::protocol::PayloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
