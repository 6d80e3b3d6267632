use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Payment not completed")]
    PaymentNotCompleted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
