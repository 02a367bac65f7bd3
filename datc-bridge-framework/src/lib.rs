//! DATC bridge framework
//!
//! Lifecycle plumbing around the gripper core:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for startup, shutdown signalling and task management
//! - [`Publisher`] for publishing serializable values to Zenoh
//! - [`BridgeArgs`] for CLI argument parsing
//! - [`BridgeStatus`] for running/offline reporting

mod args;
mod config;
mod error;
mod publisher;
mod runner;
mod status;

pub use args::BridgeArgs;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use publisher::Publisher;
pub use runner::{BridgeRunner, DEFAULT_SHUTDOWN_GRACE};
pub use status::{BridgeState, BridgeStatus, StatusPublisher};

pub use datc_common::{Format, LoggingConfig, Sample, ZenohConfig};
