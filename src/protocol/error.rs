use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("message requires JSON data")]
    MissingData,

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}
