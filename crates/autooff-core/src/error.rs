use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Page error: {0}")]
    Page(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Invalid page fixture: {0}")]
    Fixture(String),

    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
