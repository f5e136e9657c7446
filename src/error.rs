use core::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpzError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or truncated PLY or SPZ data.
    #[error("Invalid data: {0}")]
    Format(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A gaussian cloud that breaks its own invariants, caught before encoding.
    #[error("Invalid gaussian cloud: {0}")]
    Validation(String),
}

impl SpzError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        SpzError::Format(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        SpzError::UnsupportedFormat(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        SpzError::Validation(msg.into())
    }
}

impl serde::de::Error for SpzError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SpzError::Format(msg.to_string())
    }
}
