use thiserror::Error;

/// Errors raised while configuring or constructing a [`Pool`](crate::pool::Pool).
///
/// Acquire and release never fail; only setup does.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("No tokio runtime available to run the reclamation task")]
    NoRuntime,
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

impl PoolError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PoolError::InvalidConfig(msg.into())
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
