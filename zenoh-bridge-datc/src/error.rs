//! Error types for gripper commands and the register transport.

use std::time::Duration;

use thiserror::Error;

/// Failures of the register-level link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Modbus link is not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Modbus exception: {0}")]
    Exception(String),

    #[error("Link error: {0}")]
    Io(String),

    #[error("Short read: expected {expected} registers, got {got}")]
    ShortRead { expected: u16, got: usize },
}

/// Why a gripper command was not carried out.
///
/// Out-of-range physical parameters are not errors: they are clamped and
/// reported through `tracing`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Parameter outside a hard-reject range; nothing was sent.
    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl CommandError {
    pub(crate) fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }

    /// True when the command never reached the transport.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::UnknownCommand(_))
    }
}
