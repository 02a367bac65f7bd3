//! DATC common library
//!
//! Shared pieces of the DATC gripper bridge:
//!
//! - [`config`] - Zenoh and logging settings, JSON5 parsing
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`session`] - Zenoh session management
//! - [`keyexpr`] - Key expressions for state, command and status
//! - [`sample`] - Timestamped envelope for published values
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod sample;
pub mod serialization;
pub mod session;

pub use config::{BaseConfig, LogFormat, LoggingConfig, ZenohConfig, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{Channel, KEY_PREFIX, KeyExprBuilder, ParsedKeyExpr, validate_segment};
pub use sample::{Sample, current_timestamp_millis};
pub use serialization::{Format, decode, decode_auto, encode};
pub use session::connect;

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` wins over the configured level when set.
///
/// ```ignore
/// use datc_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "zenoh_bridge_datc=debug,zenoh=warn".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))
}
