//! Dashboard error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("unknown config method: {0}")]
    UnknownMethod(String),

    #[error("{method}: missing argument #{index}")]
    MissingArgument { method: String, index: usize },

    #[error("{method}: {reason}")]
    InvalidArgument { method: String, reason: String },

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DashResult<T> = Result<T, DashError>;
