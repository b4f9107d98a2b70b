use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid chunk key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
