use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
