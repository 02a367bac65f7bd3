//! Error types for the bridge framework.

use thiserror::Error;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised while starting, running or stopping a bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("Zenoh connection error: {0}")]
    ZenohConnection(String),

    #[error("Zenoh session error: {0}")]
    ZenohSession(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    pub(crate) fn publish(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Publish {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

impl From<zenoh::Error> for BridgeError {
    fn from(err: zenoh::Error) -> Self {
        Self::ZenohSession(err.to_string())
    }
}

impl From<datc_common::Error> for BridgeError {
    fn from(err: datc_common::Error) -> Self {
        match err {
            datc_common::Error::Config(msg) => Self::Config(msg),
            datc_common::Error::Zenoh(e) => Self::ZenohSession(e.to_string()),
            other @ (datc_common::Error::Encode { .. } | datc_common::Error::Decode { .. }) => {
                Self::Serialization(other.to_string())
            }
            datc_common::Error::Io(e) => Self::Io(e),
            datc_common::Error::KeyExpr(msg) => Self::ConfigValidation(msg),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<json5::Error> for BridgeError {
    fn from(err: json5::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
