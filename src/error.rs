use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
