use thiserror::Error;

pub type TouchpointResult<T> = Result<T, TouchpointError>;

#[derive(Error, Debug)]
pub enum TouchpointError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Division by zero: channel '{channel}' has zero cost")]
    DivisionByZero { channel: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<::config::ConfigError> for TouchpointError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
