use thiserror::Error;

use crate::serialization::Format;

/// Error type shared by the DATC bridge crates.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("Failed to encode {format} payload: {message}")]
    Encode { format: Format, message: String },

    #[error("Failed to decode {format} payload: {message}")]
    Decode { format: Format, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A device name or prefix that cannot be used inside a key expression.
    #[error("Invalid key expression segment: {0}")]
    KeyExpr(String),
}

impl Error {
    pub(crate) fn encode(format: Format, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(format: Format, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            format,
            message: err.to_string(),
        }
    }
}

/// Result type alias using the common [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
